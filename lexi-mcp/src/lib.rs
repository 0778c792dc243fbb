//! # lexi-mcp
//!
//! A Model Context Protocol (MCP) server that answers study questions from an
//! indexed set of textbooks. A question is embedded, the nearest passages are
//! retrieved from the index built by `lexi-retriever`, and an external text
//! generator (`ollama run mistral:7b-instruct` by default) rewrites them into
//! an answer.
//!
//! ## Request lifecycle
//!
//! ```text
//! validating → retrieving → composing → generating → done
//!      └────────────┴────────────┴────────────┴──────→ failed
//! ```
//!
//! - An empty question or an unknown mode is rejected before the index is
//!   touched.
//! - Retrieval that finds nothing answers `{"message": "no relevant content found"}`
//!   and never starts the generator.
//! - A generator that fails or overruns its deadline degrades the answer to the
//!   retrieved passage plus a placeholder; the request still succeeds.
//! - A missing or inconsistent index fails the request as unavailable, which is
//!   distinct from finding nothing.
//!
//! ## MCP Tools
//!
//! ### `ask`
//! `{ "question": "...", "mode": "brief" | "detailed" }`, returning one of
//! the payloads in [`response::AskResponse`].
//!
//! ### `status`
//! Index health, the active generation and the answering settings.
//!
//! ## Quick Start
//!
//! ```bash
//! lexi-retriever index --docs books/
//! lexi-mcp --root .                       # serve over stdio
//! lexi-mcp --root . --docs books/         # index books/ first if needed
//! lexi-mcp ask "What is inertia?" --mode detailed
//! ```
//!
//! ## Integration with Claude Desktop
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "lexi": {
//!       "command": "lexi-mcp",
//!       "args": ["--root", "/path/to/study-folder"]
//!     }
//!   }
//! }
//! ```

pub mod config;
pub mod generation;
pub mod orchestrator;
pub mod response;
mod server;
pub mod tools;

pub use config::ServerConfig;
pub use generation::{CommandGenerator, GenerationError, Generator};
pub use orchestrator::{AskService, Stage};
pub use response::{AskError, AskRequest, AskResponse, ErrorBody, ValidationError};
pub use server::LexiMcpServer;

use anyhow::{Context, Result};
use lexi_context::PromptComposer;
use lexi_embed::{EmbeddingProvider, FastEmbedProvider};
use lexi_retriever::extract::FileExtractor;
use lexi_retriever::retrieval::{
    chunking_strategy::IndexConfig, index_builder::index_directory, index_handle::IndexHandle,
    retriever::Retriever,
};
use lexi_retriever::storage::artifact_store::ArtifactStore;
use std::sync::Arc;
use tracing::info;

/// Builds the index from `docs_dir` when the index directory has none yet.
/// Returns whether a build ran. An existing index is never rebuilt, and a
/// corrupt one is reported rather than replaced.
pub async fn index_if_missing(
    config: &ServerConfig,
    embedder: Arc<dyn EmbeddingProvider>,
) -> Result<bool> {
    let Some(docs_dir) = config.resolved_docs_dir() else {
        return Ok(false);
    };
    let index_dir = config.resolved_index_dir();
    let store = ArtifactStore::new(&index_dir);
    if tokio::task::spawn_blocking(move || store.read_manifest())
        .await??
        .is_some()
    {
        return Ok(false);
    }

    info!(
        "No index under {}, building it from {}",
        index_dir.display(),
        docs_dir.display()
    );
    let loaded = index_directory(
        &IndexConfig::new(index_dir),
        &docs_dir,
        embedder,
        Arc::new(FileExtractor),
    )
    .await
    .with_context(|| format!("indexing {}", docs_dir.display()))?;
    info!("Indexed {} chunks", loaded.len());
    Ok(true)
}

/// Wires the embedding model, the on-disk index and the generator command
/// from `config` into an [`AskService`].
///
/// With `docs_dir` set, a missing index is built first. Otherwise the index
/// is loaded lazily on the first question, so the service can start before
/// one has been built.
pub async fn build_service(config: &ServerConfig) -> Result<AskService> {
    config.validate()?;

    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(
        FastEmbedProvider::create(config.resolved_embed_config())
            .await
            .context("loading embedding model")?,
    );
    index_if_missing(config, embedder.clone()).await?;

    let handle = Arc::new(IndexHandle::new(ArtifactStore::new(
        config.resolved_index_dir(),
    )));
    let retriever = Retriever::new(embedder, handle).with_top_k(config.top_k);
    let generator = CommandGenerator::from_command(&config.generator_command)
        .context("generator_command must name a program")?;

    Ok(AskService::new(
        retriever,
        PromptComposer::new(config.context_limit),
        Arc::new(generator),
        config.generation_timeout(),
    ))
}

/// Answers a single request. Invalid requests are rejected before the
/// embedding model is loaded.
pub async fn ask_once(
    config: &ServerConfig,
    request: &AskRequest,
) -> Result<std::result::Result<AskResponse, AskError>> {
    if let Err(e) = response::validate(request) {
        return Ok(Err(e.into()));
    }
    let service = build_service(config).await?;
    Ok(service.ask(request).await)
}

/// Run the Lexi MCP server over stdio until the client disconnects.
pub async fn run_server(config: ServerConfig) -> Result<()> {
    info!("Starting Lexi MCP server");
    let service = build_service(&config).await?;
    let server = LexiMcpServer::new(config, service);

    info!("Lexi MCP server initialized, starting stdio transport");
    server.serve_stdio().await
}
