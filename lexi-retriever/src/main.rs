use clap::{Parser, Subcommand};
use lexi_embed::{EmbedConfig, EmbeddingProvider, FastEmbedProvider};
use lexi_retriever::{
    RetrieverError,
    extract::FileExtractor,
    retrieval::{
        chunking_strategy::IndexConfig, index_builder::index_directory,
        index_handle::IndexHandle, retriever::Retriever,
    },
    status::IndexStatus,
    storage::artifact_store::ArtifactStore,
};
use serde::Serialize;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

/// A CLI tool to build and inspect the lexi passage index.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding manifest.json and index generations
    #[arg(short, long, default_value = ".lexi")]
    index_dir: PathBuf,

    /// Embedding model name
    #[arg(short, long, default_value = lexi_embed::DEFAULT_MODEL_NAME)]
    model: String,

    /// Directory for downloaded embedding models
    #[arg(long, default_value = ".lexi/models")]
    model_cache: PathBuf,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a new index generation from a folder of documents and activate it
    Index {
        /// Folder containing pdf, txt or md documents
        #[arg(short, long)]
        docs: PathBuf,
        /// Chunk size in characters
        #[arg(short, long, default_value_t = lexi_context::DEFAULT_CHUNK_SIZE)]
        chunk_size: NonZeroUsize,
    },
    /// Retrieve the chunks nearest to a query
    Search {
        /// Query text
        #[arg(short, long)]
        query: String,
        /// Number of neighbors
        #[arg(short, default_value_t = 3)]
        k: usize,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Show the active generation and verify its artifacts
    Status {
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    generation_id: Option<&'a str>,
    results: &'a [lexi_retriever::retrieval::retriever::RetrievedChunk],
    context: &'a str,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn embedder(args: &Args) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let config = EmbedConfig::default_with_path(&args.model_cache).with_model_name(&args.model);
    Ok(Arc::new(FastEmbedProvider::create(config).await?))
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    match &args.command {
        Commands::Index { docs, chunk_size } => {
            let config = IndexConfig::new(&args.index_dir).with_chunk_size(*chunk_size);
            let embedder = embedder(&args).await?;

            match index_directory(&config, docs, embedder, Arc::new(FileExtractor)).await {
                Ok(loaded) => {
                    println!(
                        "Indexed {} chunks into {}",
                        loaded.len(),
                        args.index_dir.display()
                    );
                    if let Some(id) = loaded.generation_id() {
                        println!("Active generation: {id}");
                    }
                    Ok(())
                }
                Err(RetrieverError::NoContent) => Err(anyhow::anyhow!(
                    "no content to index: no text could be extracted from {}",
                    docs.display()
                )),
                Err(e) => Err(e.into()),
            }
        }
        Commands::Search { query, k, format } => {
            let handle = Arc::new(IndexHandle::new(ArtifactStore::new(&args.index_dir)));
            let snapshot = handle.snapshot().await?;
            let retriever = Retriever::new(embedder(&args).await?, handle).with_top_k(*k);
            let result = retriever.retrieve_from(&snapshot, query).await?;

            match format {
                OutputFormat::Json => {
                    let output = SearchOutput {
                        query,
                        generation_id: snapshot.generation_id(),
                        results: &result.chunks,
                        context: &result.context,
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Summary => {
                    if result.is_empty() {
                        println!("No relevant content found.");
                    }
                    for (i, chunk) in result.chunks.iter().enumerate() {
                        let preview: String = chunk.text.chars().take(120).collect();
                        println!(
                            "{}. #{} distance {:.4}: {}",
                            i + 1,
                            chunk.ordinal,
                            chunk.distance,
                            preview.replace('\n', " ")
                        );
                    }
                }
            }
            Ok(())
        }
        Commands::Status { format } => {
            let status = IndexStatus::collect_async(ArtifactStore::new(&args.index_dir)).await;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
                OutputFormat::Summary => print!("{}", status.summary()),
            }
            Ok(())
        }
    }
}
