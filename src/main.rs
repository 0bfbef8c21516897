use std::path::PathBuf;

use clap::{Parser, Subcommand};
use doc_rag::commands::{QueryOutput, chunk_document, run_query, show_health};
use doc_rag::config::{Config, EmbedderBackend, init_config, show_config};

#[derive(Parser)]
#[command(name = "doc-rag")]
#[command(about = "Chunk, embed and search documents for retrieval-augmented generation")]
#[command(version)]
struct Cli {
    /// Embedding backend to use instead of the configured one
    #[arg(long, global = true, value_enum)]
    embedder: Option<EmbedderBackend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current configuration, or write the default config file
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Print the chunks a document is split into
    Chunk {
        /// Text or markdown file to split
        file: PathBuf,
    },
    /// Ingest documents and retrieve the chunks most relevant to a question
    Query {
        /// The question to answer
        question: String,
        /// Documents to ingest before querying
        #[arg(long = "doc", required = true)]
        docs: Vec<PathBuf>,
        /// Maximum number of chunks to return
        #[arg(long)]
        max_results: Option<usize>,
        /// Print the full prompt for a chat model instead of the ranked chunks
        #[arg(long, conflicts_with = "json")]
        prompt: bool,
        /// Print ranked chunks as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ingest documents and print the index health report
    Health {
        /// Documents to ingest
        #[arg(long = "doc")]
        docs: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load_default()?;
    if let Some(embedder) = cli.embedder {
        config.embedder = embedder;
    }

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config)?;
            } else {
                init_config(config.get_base_dir())?;
            }
        }
        Commands::Chunk { file } => {
            chunk_document(&config, &file).await?;
        }
        Commands::Query {
            question,
            docs,
            max_results,
            prompt,
            json,
        } => {
            let output = if prompt {
                QueryOutput::Prompt
            } else if json {
                QueryOutput::Json
            } else {
                QueryOutput::Chunks
            };
            run_query(&config, &question, &docs, max_results, output).await?;
        }
        Commands::Health { docs } => {
            show_health(&config, &docs).await?;
        }
    }

    Ok(())
}
