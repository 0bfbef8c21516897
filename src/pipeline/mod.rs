// Retrieval pipeline
// Wires the chunker, an embedder and the vector index into ingestion and retrieval

pub mod prompt;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{Config, RetrievalConfig};
use crate::embeddings::{Chunker, Embedder, embedder_from_config};
use crate::index::{SearchHit, VectorIndex, VectorRecord};
use crate::{RagError, Result};

pub use prompt::{build_context, build_rag_prompt};

/// Snapshot of the pipeline's state for health endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub embedder: String,
    pub embeddings_stored: usize,
    pub dimension: Option<usize>,
    pub timestamp: DateTime<Utc>,
}

/// Ingestion and retrieval over a shared vector index.
///
/// The embedder is always called before the index lock is taken, so a slow
/// embedding backend never blocks concurrent searches.
pub struct RagPipeline {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    index: Arc<VectorIndex>,
    retrieval: RetrievalConfig,
}

impl RagPipeline {
    #[inline]
    pub fn new(
        chunker: Chunker,
        embedder: Arc<dyn Embedder>,
        index: Arc<VectorIndex>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            chunker,
            embedder,
            index,
            retrieval,
        }
    }

    /// Build a pipeline with the configured embedder and an empty index
    ///
    /// # Errors
    ///
    /// `RagError::Config` if `config` fails validation.
    #[inline]
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let embedder = embedder_from_config(config)?;
        Ok(Self::new(
            Chunker::new(config.chunking),
            embedder,
            Arc::new(VectorIndex::new()),
            config.retrieval,
        ))
    }

    /// Shared handle to the underlying index
    #[inline]
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    #[inline]
    pub fn retrieval_config(&self) -> &RetrievalConfig {
        &self.retrieval
    }

    /// Chunk, embed and store a document, returning the number of chunks stored.
    ///
    /// Text that is empty or only whitespace stores nothing and returns 0. An
    /// empty `document_name` is replaced with a timestamped one.
    ///
    /// Ingestion is all-or-nothing: every chunk is embedded before anything is
    /// inserted, so an embedding failure leaves the index untouched.
    ///
    /// # Errors
    ///
    /// `RagError::Embedding` if the embedder fails or returns the wrong number
    /// of vectors, `RagError::DimensionMismatch` if the vectors do not match
    /// the index's dimension.
    #[inline]
    pub fn ingest(&self, document_text: &str, document_name: &str) -> Result<usize> {
        let document_name = if document_name.trim().is_empty() {
            format!("document-{}", Utc::now().timestamp_millis())
        } else {
            document_name.to_string()
        };

        info!("Ingesting document: {}", document_name);

        let chunks = self.chunker.split(document_text, &document_name);
        if chunks.is_empty() {
            debug!("Document '{}' produced no chunks", document_name);
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_all(&texts)?;

        if vectors.len() != chunks.len() {
            warn!(
                "Embedder returned {} vectors for {} chunks of '{}'",
                vectors.len(),
                chunks.len(),
                document_name
            );
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let records = vectors
            .into_iter()
            .zip(chunks)
            .map(|(vector, chunk)| VectorRecord { vector, chunk })
            .collect();
        let stored = self.index.insert_batch(records)?;

        info!(
            "Successfully ingested {} chunks from document: {} (total {})",
            stored,
            document_name,
            self.index.count()
        );
        Ok(stored)
    }

    /// Return the text of the chunks most similar to `query_text`, best first
    ///
    /// # Errors
    ///
    /// `RagError::InvalidInput` for an empty query, `RagError::Embedding` if
    /// the query cannot be embedded.
    #[inline]
    pub fn retrieve(&self, query_text: &str, max_results: usize) -> Result<Vec<String>> {
        Ok(self
            .retrieve_scored(query_text, max_results)?
            .into_iter()
            .map(|hit| hit.chunk.text)
            .collect())
    }

    /// Like [`retrieve`](Self::retrieve), keeping chunk metadata and scores
    #[inline]
    pub fn retrieve_scored(&self, query_text: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        if query_text.trim().is_empty() {
            return Err(RagError::InvalidInput("Query cannot be empty".to_string()));
        }

        debug!("Searching for relevant chunks (limit: {})", max_results);

        let query_vector = self.embedder.embed(query_text)?;
        let hits = self
            .index
            .search_scored(&query_vector, max_results, self.retrieval.min_score)?;

        info!("Found {} relevant chunks", hits.len());
        Ok(hits)
    }

    /// Number of stored embeddings
    #[inline]
    pub fn stored_count(&self) -> usize {
        self.index.count()
    }

    #[inline]
    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "UP".to_string(),
            embedder: self.embedder.name().to_string(),
            embeddings_stored: self.index.count(),
            dimension: self.index.dimension().or_else(|| self.embedder.dimension()),
            timestamp: Utc::now(),
        }
    }
}
