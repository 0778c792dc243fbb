//! lexi-retriever: building and querying the passage index
//!
//! Documents are extracted to text, split into fixed-size chunks, embedded,
//! and stored as a flat vector index next to an index-aligned text mapping.
//! Queries embed the question with the same model, run an exhaustive
//! squared-L2 nearest-neighbor search, and join the matching chunk texts into
//! one context string.
//!
//! ## Key Modules
//!
//! - **[`extract`]**: document to text conversion
//! - **[`retrieval`]**: chunking policy, index building, vector search, retrieval
//! - **[`storage`]**: versioned on-disk generations with checksummed artifacts
//! - **[`status`]**: index diagnostics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lexi_embed::{EmbedConfig, FastEmbedProvider};
//! use lexi_retriever::extract::FileExtractor;
//! use lexi_retriever::retrieval::{
//!     chunking_strategy::IndexConfig, index_builder::index_directory,
//!     index_handle::IndexHandle, retriever::Retriever,
//! };
//! use lexi_retriever::storage::artifact_store::ArtifactStore;
//! use std::{path::Path, sync::Arc};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = IndexConfig::default();
//! let embedder = Arc::new(FastEmbedProvider::create(EmbedConfig::default()).await?);
//! index_directory(&config, Path::new("books"), embedder.clone(), Arc::new(FileExtractor)).await?;
//!
//! let handle = Arc::new(IndexHandle::new(ArtifactStore::new(&config.index_dir)));
//! let result = Retriever::new(embedder, handle).retrieve("What is inertia?").await?;
//! println!("{}", result.context);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Documents → Extractor → Chunking → Embeddings → Generation (vectors.bin + mapping.json)
//!                                                      ↓ manifest.json
//! Question → Embedding → IndexHandle snapshot → FlatIndex search → context
//! ```

pub mod error;
pub mod extract;
pub mod retrieval;
pub mod status;
pub mod storage;

pub use error::{Result, RetrieverError, UnavailableReason};
