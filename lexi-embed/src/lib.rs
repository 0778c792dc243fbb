//! # lexi-embed
//!
//! Text embeddings for the lexi question-answering pipeline. Every chunk of
//! indexed material and every incoming question goes through an
//! [`EmbeddingProvider`], so the two always land in the same vector space.
//!
//! ## Quick Start
//!
//! ```no_run
//! use lexi_embed::{EmbedConfig, EmbeddingProvider, FastEmbedProvider};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let provider = FastEmbedProvider::create(EmbedConfig::default_with_path("/tmp/models")).await?;
//!
//! let texts = vec!["Define momentum.".to_string(), "State Hooke's law.".to_string()];
//! let result = provider.embed_texts(&texts).await?;
//!
//! println!("Generated {} embeddings of dimension {}", result.len(), result.dimension);
//! # Ok(())
//! # }
//! ```
//!
//! ## Providers
//!
//! - [`FastEmbedProvider`]: local ONNX sentence-transformer models through
//!   fastembed. The default is `all-MiniLM-L6-v2` (384 dimensions).
//! - [`HashEmbedProvider`]: a deterministic bag-of-words hasher with no model
//!   files, used by tests and offline smoke runs.
//!
//! Providers hold no global state. Build one at startup and share it.

pub mod config;
pub mod error;
pub mod hashing;
pub mod provider;

pub use config::{DEFAULT_MODEL_NAME, EmbedConfig, EmbedConfigBuilder, SUPPORTED_MODELS};
pub use error::{EmbedError, Result};
pub use hashing::{HASH_MODEL_NAME, HashEmbedProvider};
pub use provider::{EmbeddingProvider, EmbeddingResult, FastEmbedProvider, l2_normalize};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_providers_are_object_safe() {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbedProvider::default());
        let vector = provider.embed_text("refraction").await.unwrap();

        assert_eq!(vector.len(), provider.embedding_dimension());
        assert_eq!(provider.model_name(), HASH_MODEL_NAME);
    }
}
