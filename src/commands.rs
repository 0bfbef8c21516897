use anyhow::{Context, Result};
use console::style;
use futures::future::try_join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::RagError;
use crate::config::Config;
use crate::embeddings::Chunker;
use crate::pipeline::{RagPipeline, build_context, build_rag_prompt};

/// How `query` prints its results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutput {
    /// Ranked chunks with scores
    Chunks,
    /// The full prompt for a chat backend
    Prompt,
    /// Ranked hits as JSON
    Json,
}

/// Read a document and reject empty ones; the parser layer treats an empty
/// document as a failed parse rather than nothing to ingest.
async fn read_document(path: &Path) -> Result<String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read document: {}", path.display()))?;

    if text.trim().is_empty() {
        return Err(RagError::InvalidInput(format!(
            "Document text is empty: {}",
            path.display()
        ))
        .into());
    }

    Ok(text)
}

fn document_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

/// Ingest every document concurrently into `pipeline`, returning the total
/// number of chunks stored
#[inline]
pub async fn ingest_documents(pipeline: &Arc<RagPipeline>, documents: &[PathBuf]) -> Result<usize> {
    let bar = if console::user_attended_stderr() {
        ProgressBar::new(documents.len() as u64).with_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] Ingesting {msg}")
                .context("Invalid progress template")?,
        )
    } else {
        ProgressBar::hidden()
    };

    let tasks = documents.iter().map(|path| {
        let pipeline = Arc::clone(pipeline);
        let bar = bar.clone();
        let path = path.clone();

        async move {
            let text = read_document(&path).await?;
            let name = document_name(&path);
            bar.set_message(name.clone());

            // Embedding may block on network I/O
            let stored = tokio::task::spawn_blocking(move || pipeline.ingest(&text, &name))
                .await
                .context("Ingestion task panicked")??;

            bar.inc(1);
            Ok::<usize, anyhow::Error>(stored)
        }
    });

    let counts = try_join_all(tasks).await?;
    bar.finish_and_clear();

    let total = counts.iter().sum();
    info!("Ingested {} documents ({} chunks)", documents.len(), total);
    Ok(total)
}

/// Print how a document would be chunked
#[inline]
pub async fn chunk_document(config: &Config, path: &Path) -> Result<()> {
    let text = read_document(path).await?;
    let chunks = Chunker::new(config.chunking).split(&text, &document_name(path));

    println!(
        "{} chunks (max {} chars, overlap {})",
        chunks.len(),
        config.chunking.max_chunk_size,
        config.chunking.chunk_overlap
    );

    for chunk in &chunks {
        println!();
        println!(
            "{}",
            style(format!(
                "── chunk {}/{} ({} chars)",
                chunk.chunk_index + 1,
                chunk.total_chunks,
                chunk.text.chars().count()
            ))
            .bold()
            .yellow()
        );
        println!("{}", chunk.text);
    }

    Ok(())
}

/// Ingest `documents`, then answer `question` from the index
#[inline]
pub async fn run_query(
    config: &Config,
    question: &str,
    documents: &[PathBuf],
    max_results: Option<usize>,
    output: QueryOutput,
) -> Result<()> {
    let pipeline = Arc::new(RagPipeline::from_config(config)?);
    ingest_documents(&pipeline, documents).await?;

    let limit = max_results.unwrap_or(pipeline.retrieval_config().max_results);
    let query = question.to_string();
    let search = Arc::clone(&pipeline);
    let hits = tokio::task::spawn_blocking(move || search.retrieve_scored(&query, limit))
        .await
        .context("Query task panicked")??;

    match output {
        QueryOutput::Json => {
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
        QueryOutput::Prompt => {
            let texts: Vec<&str> = hits.iter().map(|hit| hit.chunk.text.as_str()).collect();
            println!("{}", build_rag_prompt(question, &build_context(&texts)));
        }
        QueryOutput::Chunks => {
            if hits.is_empty() {
                println!("No relevant chunks found.");
            }
            for (rank, hit) in hits.iter().enumerate() {
                println!(
                    "{} {} {}",
                    style(format!("#{}", rank + 1)).bold().cyan(),
                    style(format!("{:.3}", hit.score)).green(),
                    style(format!(
                        "{} [{}/{}]",
                        hit.chunk.source_document,
                        hit.chunk.chunk_index + 1,
                        hit.chunk.total_chunks
                    ))
                    .dim()
                );
                println!("{}", hit.chunk.text);
                println!();
            }
        }
    }

    Ok(())
}

/// Ingest `documents` and print the health report as JSON
#[inline]
pub async fn show_health(config: &Config, documents: &[PathBuf]) -> Result<()> {
    let pipeline = Arc::new(RagPipeline::from_config(config)?);
    ingest_documents(&pipeline, documents).await?;

    println!("{}", serde_json::to_string_pretty(&pipeline.health())?);
    Ok(())
}
