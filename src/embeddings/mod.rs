// Embeddings module
// Chunking of document text and the embedding backends that turn chunks into vectors

pub mod chunking;
pub mod hashing;
pub mod ollama;

use std::sync::Arc;

use tracing::info;

use crate::Result;
use crate::config::{Config, EmbedderBackend};

pub use chunking::{Chunk, Chunker, ChunkingConfig};
pub use hashing::HashingEmbedder;
pub use ollama::OllamaClient;

/// A stable mapping from text to a fixed-length vector.
///
/// The vector index never depends on a concrete backend; embedders are built
/// once at startup and handed to the pipeline as `Arc<dyn Embedder>`.
pub trait Embedder: Send + Sync {
    /// Short backend name used in logs and health output
    fn name(&self) -> &str;

    /// Dimension of the vectors this embedder produces, when known up front
    fn dimension(&self) -> Option<usize>;

    /// Embed a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed many texts, returning one vector per input in the same order
    #[inline]
    fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

/// Build the embedder selected in `config`
///
/// Invalid Ollama settings are reported as `RagError::Config`.
#[inline]
pub fn embedder_from_config(config: &Config) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match config.embedder {
        EmbedderBackend::Ollama => {
            config.ollama.validate()?;
            Arc::new(OllamaClient::new(&config.ollama)?)
        }
        EmbedderBackend::Hashing => Arc::new(HashingEmbedder::new(config.hashing.dimension)),
    };

    info!(
        "Using {} embedder ({} dimensions)",
        embedder.name(),
        embedder
            .dimension()
            .map_or_else(|| "unknown".to_string(), |d| d.to_string())
    );

    Ok(embedder)
}
