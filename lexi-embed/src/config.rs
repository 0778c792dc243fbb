//! Configuration for embedding models

use crate::error::{EmbedError, Result};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Model used when nothing else is configured. Its output dimension is 384.
pub const DEFAULT_MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// Model names this crate knows how to load through fastembed.
pub const SUPPORTED_MODELS: &[&str] = &[DEFAULT_MODEL_NAME, "all-MiniLM-L12-v2", "bge-small-en-v1.5"];

/// Configuration for embedding models.
///
/// The same configuration must be used to build an index and to query it:
/// vectors from different models are not comparable, and the index refuses
/// queries whose dimension differs from the stored vectors.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
#[serde(default)]
pub struct EmbedConfig {
    /// Name of the embedding model to use
    #[builder(default = r#"DEFAULT_MODEL_NAME.to_string()"#)]
    pub model_name: String,
    /// Directory where downloaded model files are cached
    #[builder(default = r#"PathBuf::from(".lexi/models")"#)]
    pub cache_dir: PathBuf,
    /// Maximum batch size for embedding generation
    #[builder(default = "32")]
    pub batch_size: usize,
    /// Whether to L2-normalize embeddings
    #[builder(default = "true")]
    pub normalize: bool,
    /// Whether to print download progress when fetching a model
    #[builder(default = "false")]
    pub show_download_progress: bool,
}

impl EmbedConfig {
    /// Create a new embedding configuration using the builder
    pub fn builder() -> EmbedConfigBuilder {
        EmbedConfigBuilder::default()
    }

    /// Default model with its cache placed under `cache_dir`
    pub fn default_with_path<P: AsRef<Path>>(cache_dir: P) -> Self {
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Set the model name (builder style)
    pub fn with_model_name<S: Into<String>>(self, model_name: S) -> Self {
        Self {
            model_name: model_name.into(),
            ..self
        }
    }

    /// Set the batch size for embedding generation (builder style)
    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    /// Set whether to normalize embeddings (builder style)
    pub fn with_normalize(self, normalize: bool) -> Self {
        Self { normalize, ..self }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Check the configuration before any model is loaded.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EmbedError::invalid_config("batch_size must be at least 1"));
        }
        if !SUPPORTED_MODELS.contains(&self.model_name.as_str()) {
            tracing::error!("Unsupported embedding model: {}", self.model_name);
            return Err(EmbedError::invalid_config(format!(
                "unsupported model '{}'; expected one of: {}",
                self.model_name,
                SUPPORTED_MODELS.join(", ")
            )));
        }
        Ok(())
    }
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            cache_dir: PathBuf::from(".lexi/models"),
            batch_size: 32,
            normalize: true,
            show_download_progress: false,
        }
    }
}
