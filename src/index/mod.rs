// In-memory vector index
// Append-only (vector, chunk) records with brute-force cosine similarity search


use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::embeddings::Chunk;
use crate::{RagError, Result};

/// A stored embedding and the chunk it was computed from
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub vector: Vec<f32>,
    pub chunk: Chunk,
}

/// A ranked search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub chunk: Chunk,
    /// Cosine similarity to the query, in `[-1.0, 1.0]`
    pub score: f32,
}

#[derive(Debug, Default)]
struct IndexState {
    dimension: Option<usize>,
    records: Vec<VectorRecord>,
}

impl IndexState {
    fn check_dimension(&self, actual: usize) -> Result<()> {
        match self.dimension {
            Some(expected) if expected != actual => {
                Err(RagError::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }
}

/// Append-only in-memory vector index.
///
/// All vectors share one dimension, fixed at construction or by the first
/// insertion. Inserts take the write lock; searches take the read lock and may
/// run concurrently with each other. The index is meant to be created once and
/// shared as `Arc<VectorIndex>`.
#[derive(Debug, Default)]
pub struct VectorIndex {
    state: RwLock<IndexState>,
}

impl VectorIndex {
    /// Create an empty index whose dimension is set by the first insertion
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index that only accepts `dimension`-length vectors
    #[inline]
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            state: RwLock::new(IndexState {
                dimension: Some(dimension),
                records: Vec::new(),
            }),
        }
    }

    // Writers validate before mutating, so a poisoned lock still guards
    // consistent state.
    fn read(&self) -> RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store one record.
    ///
    /// # Errors
    ///
    /// Returns `RagError::DimensionMismatch` if `vector` differs in length from
    /// the index's established dimension. The index is left unchanged.
    #[inline]
    pub fn insert(&self, vector: Vec<f32>, chunk: Chunk) -> Result<()> {
        let mut state = self.write();

        if let Err(e) = state.check_dimension(vector.len()) {
            warn!("Rejected insert for '{}': {}", chunk.source_document, e);
            return Err(e);
        }

        state.dimension = Some(vector.len());
        state.records.push(VectorRecord { vector, chunk });
        Ok(())
    }

    /// Store a batch of records atomically: either every record is stored or,
    /// on a dimension mismatch anywhere in the batch, none are.
    ///
    /// Returns the number of records stored.
    #[inline]
    pub fn insert_batch(&self, records: Vec<VectorRecord>) -> Result<usize> {
        let Some(first) = records.first() else {
            return Ok(0);
        };

        let mut state = self.write();
        let expected = state.dimension.unwrap_or(first.vector.len());

        if let Some(bad) = records.iter().find(|r| r.vector.len() != expected) {
            let e = RagError::DimensionMismatch {
                expected,
                actual: bad.vector.len(),
            };
            warn!(
                "Rejected batch of {} records for '{}': {}",
                records.len(),
                bad.chunk.source_document,
                e
            );
            return Err(e);
        }

        let stored = records.len();
        state.dimension = Some(expected);
        state.records.extend(records);

        debug!("Stored {} records (total {})", stored, state.records.len());
        Ok(stored)
    }

    /// Rank stored records against `query` and return up to `k` hits with a
    /// score of at least `min_score`.
    ///
    /// Hits are ordered by descending score; equal scores keep insertion
    /// order.
    ///
    /// # Errors
    ///
    /// Returns `RagError::DimensionMismatch` if the index holds records and
    /// `query` has a different length.
    #[inline]
    pub fn search_scored(&self, query: &[f32], k: usize, min_score: f32) -> Result<Vec<SearchHit>> {
        let state = self.read();

        if k == 0 || state.records.is_empty() {
            return Ok(Vec::new());
        }
        state.check_dimension(query.len())?;

        let mut scored: Vec<(usize, f32)> = state
            .records
            .iter()
            .enumerate()
            .map(|(position, record)| (position, cosine_similarity(query, &record.vector)))
            .filter(|&(_, score)| score >= min_score)
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        let hits: Vec<SearchHit> = scored
            .into_iter()
            .filter_map(|(position, score)| {
                state.records.get(position).map(|record| SearchHit {
                    chunk: record.chunk.clone(),
                    score,
                })
            })
            .collect();

        info!(
            "Search over {} records returned {} hits",
            state.records.len(),
            hits.len()
        );
        Ok(hits)
    }

    /// Like [`search_scored`](Self::search_scored), returning only the chunks
    #[inline]
    pub fn search(&self, query: &[f32], k: usize, min_score: f32) -> Result<Vec<Chunk>> {
        Ok(self
            .search_scored(query, k, min_score)?
            .into_iter()
            .map(|hit| hit.chunk)
            .collect())
    }

    /// Number of stored records
    #[inline]
    pub fn count(&self) -> usize {
        self.read().records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// The established vector dimension, if any
    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.read().dimension
    }
}

/// Cosine of the angle between `a` and `b`, clamped to `[-1.0, 1.0]`.
///
/// Zero-magnitude vectors have no direction and score `0.0` against anything.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    // Accumulate in f64 so very large or very small finite components neither
    // overflow nor underflow
    let dot: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum();
    let mag_a = a.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt();
    let mag_b = b.iter().map(|&y| f64::from(y) * f64::from(y)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    (dot / (mag_a * mag_b)).clamp(-1.0, 1.0) as f32
}
