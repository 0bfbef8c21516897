use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use super::Config;

/// Print the effective configuration to stderr
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!(
        "{} {}",
        style("Embedder:").bold().yellow(),
        style(config.embedder).cyan()
    );
    eprintln!();

    eprintln!("{}", style("Ollama Settings:").bold().yellow());
    eprintln!("  Host: {}", style(&config.ollama.host).cyan());
    eprintln!("  Port: {}", style(config.ollama.port).cyan());
    eprintln!("  Model: {}", style(&config.ollama.model).cyan());
    eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());
    eprintln!(
        "  Embedding Dimension: {}",
        style(config.ollama.embedding_dimension).cyan()
    );
    match config.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }
    eprintln!();

    eprintln!("{}", style("Hashing Settings:").bold().yellow());
    eprintln!("  Dimension: {}", style(config.hashing.dimension).cyan());
    eprintln!();

    eprintln!("{}", style("Chunking Settings:").bold().yellow());
    eprintln!(
        "  Max Chunk Size: {} chars",
        style(config.chunking.max_chunk_size).cyan()
    );
    eprintln!(
        "  Chunk Overlap: {} chars",
        style(config.chunking.chunk_overlap).cyan()
    );
    eprintln!();

    eprintln!("{}", style("Retrieval Settings:").bold().yellow());
    eprintln!("  Max Results: {}", style(config.retrieval.max_results).cyan());
    eprintln!("  Min Score: {}", style(config.retrieval.min_score).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

/// Write a config file with the settings stored in `config_dir` (defaults
/// when none exist yet). Environment and command-line overrides are never
/// persisted.
#[inline]
pub fn init_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir)?;
    let config_path = config.config_file_path();

    if config_path.exists() {
        eprintln!(
            "Configuration already exists at {}",
            style(config_path.display()).cyan()
        );
        return Ok(());
    }

    config.save().context("Failed to save configuration")?;
    eprintln!("{}", style("✓ Configuration saved successfully!").green());
    eprintln!(
        "Configuration saved to: {}",
        style(config_path.display()).cyan()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbedderBackend;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn init_writes_defaults() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let config_dir = temp_dir.path().join(".doc-rag");

        init_config(&config_dir).expect("should write config");

        let saved = Config::load(&config_dir).expect("should load config");
        assert_eq!(
            saved,
            Config {
                base_dir: config_dir,
                ..Config::default()
            }
        );
    }

    #[test]
    fn init_ignores_runtime_overrides() {
        let temp_dir = TempDir::new().expect("should create temp dir");

        // Overrides applied to an in-memory config must not reach the file
        let mut runtime = Config::load(temp_dir.path()).expect("should load defaults");
        runtime.embedder = EmbedderBackend::Hashing;
        runtime
            .apply_overrides(|key: &str| (key == "OLLAMA_HOST").then(|| "gpu-box".to_string()))
            .expect("override is valid");

        init_config(runtime.get_base_dir()).expect("should write config");

        let content =
            fs::read_to_string(temp_dir.path().join("config.toml")).expect("should read config");
        assert!(!content.contains("gpu-box"));
        assert!(content.contains(r#"embedder = "ollama""#));
    }

    #[test]
    fn init_keeps_existing_file() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "embedder = \"hashing\"\n").expect("should write config");

        init_config(temp_dir.path()).expect("existing config is fine");

        let content = fs::read_to_string(&config_path).expect("should read config");
        assert_eq!(content, "embedder = \"hashing\"\n");
    }
}
