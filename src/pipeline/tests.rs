use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use super::*;
use crate::embeddings::{ChunkingConfig, HashingEmbedder};

/// Embedder that fails after a fixed number of successful calls
struct FlakyEmbedder {
    inner: HashingEmbedder,
    remaining: AtomicUsize,
}

impl Embedder for FlakyEmbedder {
    fn name(&self) -> &str {
        "flaky"
    }

    fn dimension(&self) -> Option<usize> {
        self.inner.dimension()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let left = self.remaining.load(Ordering::SeqCst);
        if left == 0 {
            return Err(RagError::Embedding("connection refused".to_string()));
        }
        self.remaining.store(left - 1, Ordering::SeqCst);
        self.inner.embed(text)
    }
}

/// Embedder that drops the last vector of every batch
struct ShortBatchEmbedder;

impl Embedder for ShortBatchEmbedder {
    fn name(&self) -> &str {
        "short"
    }

    fn dimension(&self) -> Option<usize> {
        Some(2)
    }

    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }

    fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(vec![vec![1.0, 0.0]; texts.len().saturating_sub(1)])
    }
}

/// Embedder whose output length is the text length, to provoke mismatches
struct LengthEmbedder;

impl Embedder for LengthEmbedder {
    fn name(&self) -> &str {
        "length"
    }

    fn dimension(&self) -> Option<usize> {
        None
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0; text.chars().count()])
    }
}

fn pipeline_with(embedder: Arc<dyn Embedder>) -> RagPipeline {
    RagPipeline::new(
        Chunker::default(),
        embedder,
        Arc::new(VectorIndex::new()),
        RetrievalConfig::default(),
    )
}

fn hashing_pipeline() -> RagPipeline {
    pipeline_with(Arc::new(HashingEmbedder::default()))
}

#[test]
fn ingest_returns_stored_chunk_count() {
    let pipeline = hashing_pipeline();
    let text = "Apache Camel is an open-source integration framework. ".repeat(30);

    let stored = pipeline.ingest(&text, "camel.md").expect("ingest succeeds");

    assert!(stored > 1);
    assert_eq!(pipeline.stored_count(), stored);
}

#[test]
fn ingest_empty_text_stores_nothing() {
    let pipeline = hashing_pipeline();

    assert_eq!(pipeline.ingest("", "empty.md").expect("ingest succeeds"), 0);
    assert_eq!(pipeline.ingest(" \n ", "blank.md").expect("ingest succeeds"), 0);
    assert_eq!(pipeline.stored_count(), 0);
}

#[test]
fn empty_document_name_is_generated() {
    let pipeline = hashing_pipeline();
    pipeline
        .ingest("Some content worth storing.", "  ")
        .expect("ingest succeeds");

    let hits = pipeline
        .retrieve_scored("content", 1)
        .expect("retrieve succeeds");
    assert!(hits[0].chunk.source_document.starts_with("document-"));
}

#[test]
fn retrieve_ranks_relevant_document_first() {
    let pipeline = hashing_pipeline();
    pipeline
        .ingest(
            "Apache Camel is an integration framework based on enterprise integration patterns.",
            "camel.md",
        )
        .expect("ingest succeeds");
    pipeline
        .ingest(
            "Sourdough bread needs flour, water, salt and a lively starter.",
            "bread.md",
        )
        .expect("ingest succeeds");

    let results = pipeline
        .retrieve("What is the Camel integration framework?", 5)
        .expect("retrieve succeeds");

    assert!(!results.is_empty());
    assert!(results[0].contains("Apache Camel"));
}

#[test]
fn retrieve_respects_max_results() {
    let pipeline = hashing_pipeline();
    for i in 0..10 {
        pipeline
            .ingest(&format!("shared topic note number {}", i), &format!("note-{}", i))
            .expect("ingest succeeds");
    }

    let results = pipeline.retrieve("shared topic", 3).expect("retrieve succeeds");
    assert_eq!(results.len(), 3);
}

#[test]
fn retrieve_from_empty_index() {
    let pipeline = hashing_pipeline();
    let results = pipeline.retrieve("anything", 5).expect("retrieve succeeds");
    assert!(results.is_empty());
}

#[test]
fn empty_query_is_invalid_input() {
    let pipeline = hashing_pipeline();
    assert!(matches!(
        pipeline.retrieve("   ", 5),
        Err(RagError::InvalidInput(_))
    ));
}

#[test]
fn embedding_failure_stores_nothing() {
    let pipeline = pipeline_with(Arc::new(FlakyEmbedder {
        inner: HashingEmbedder::new(8),
        remaining: AtomicUsize::new(1),
    }));
    let text = "a".repeat(1200);

    let result = pipeline.ingest(&text, "partial.txt");

    assert!(matches!(result, Err(RagError::Embedding(_))));
    assert!(!result.is_err_and(|e| e.is_fatal()));
    assert_eq!(pipeline.stored_count(), 0);
}

#[test]
fn short_embedding_batch_is_rejected() {
    let pipeline = pipeline_with(Arc::new(ShortBatchEmbedder));

    let result = pipeline.ingest("One chunk only.", "short.md");

    assert!(matches!(result, Err(RagError::Embedding(_))));
    assert_eq!(pipeline.stored_count(), 0);
}

#[test]
fn dimension_change_between_documents_is_fatal() {
    let pipeline = pipeline_with(Arc::new(LengthEmbedder));
    pipeline.ingest("abcd", "first").expect("ingest succeeds");

    let result = pipeline.ingest("abcdefgh", "second");

    assert!(matches!(
        result,
        Err(RagError::DimensionMismatch {
            expected: 4,
            actual: 8
        })
    ));
    assert_eq!(pipeline.stored_count(), 1);
}

#[test]
fn health_report() {
    let pipeline = hashing_pipeline();
    pipeline
        .ingest("Health checks report stored embeddings.", "health.md")
        .expect("ingest succeeds");

    let report = pipeline.health();
    assert_eq!(report.status, "UP");
    assert_eq!(report.embedder, "hashing");
    assert_eq!(report.embeddings_stored, 1);
    assert_eq!(report.dimension, Some(384));

    let json = serde_json::to_value(&report).expect("report serializes");
    assert_eq!(json["embeddings_stored"], 1);
}

#[test]
fn from_config_uses_configured_backend() {
    let config = Config {
        embedder: crate::config::EmbedderBackend::Hashing,
        chunking: ChunkingConfig {
            max_chunk_size: 100,
            chunk_overlap: 10,
        },
        ..Config::default()
    };
    let pipeline = RagPipeline::from_config(&config).expect("pipeline builds");

    let stored = pipeline
        .ingest(&"x".repeat(250), "sized.txt")
        .expect("ingest succeeds");
    assert_eq!(stored, 3);
    assert_eq!(pipeline.health().embedder, "hashing");
}

#[test]
fn concurrent_ingest_and_retrieve() {
    let pipeline = Arc::new(hashing_pipeline());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let pipeline = Arc::clone(&pipeline);
            thread::spawn(move || {
                pipeline
                    .ingest(&format!("document {} about concurrency", i), &format!("doc-{}", i))
                    .expect("ingest succeeds");
                pipeline
                    .retrieve("concurrency", 3)
                    .expect("retrieve succeeds")
            })
        })
        .collect();

    for handle in handles {
        let results = handle.join().expect("thread completes");
        assert!(!results.is_empty());
    }

    assert_eq!(pipeline.stored_count(), 8);
}

#[test]
fn index_handle_is_shared() {
    let index = Arc::new(VectorIndex::new());
    let pipeline = RagPipeline::new(
        Chunker::default(),
        Arc::new(HashingEmbedder::default()),
        Arc::clone(&index),
        RetrievalConfig::default(),
    );

    pipeline
        .ingest("Shared handles see every insert.", "shared.md")
        .expect("ingest succeeds");

    assert!(Arc::ptr_eq(pipeline.index(), &index));
    assert_eq!(index.count(), 1);
    assert_eq!(index.dimension(), Some(384));
}

#[test]
fn from_config_rejects_invalid_settings() {
    let mut config = Config {
        embedder: crate::config::EmbedderBackend::Hashing,
        ..Config::default()
    };
    config.retrieval.min_score = 5.0;

    let err = RagPipeline::from_config(&config)
        .err()
        .expect("invalid min score is rejected");
    assert!(matches!(err, RagError::Config(_)));
    assert!(err.is_fatal());

    let mut config = Config::default();
    config.chunking.max_chunk_size = 100;
    config.chunking.chunk_overlap = 100;
    assert!(RagPipeline::from_config(&config).is_err_and(|e| e.is_fatal()));
}

#[test]
fn invalid_ollama_host_is_a_config_error() {
    let mut config = Config::default();
    config.ollama.host = "bad host".to_string();

    let err = crate::embeddings::embedder_from_config(&config)
        .err()
        .expect("bad host is rejected");
    assert!(matches!(err, RagError::Config(_)));
    assert!(err.is_fatal());

    let err = RagPipeline::from_config(&config)
        .err()
        .expect("bad host is rejected");
    assert!(matches!(err, RagError::Config(_)));
}
