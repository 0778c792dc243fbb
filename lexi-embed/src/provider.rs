//! Embedding provider implementations

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};

/// Result of embedding generation
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingResult {
    /// The generated embeddings, one per input text
    pub embeddings: Vec<Vec<f32>>,
    /// The dimension of each embedding vector
    pub dimension: usize,
}

impl EmbeddingResult {
    /// Create a new embedding result.
    ///
    /// The dimension is inferred from the first embedding vector, or 0 when
    /// there are none.
    pub fn new(embeddings: Vec<Vec<f32>>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// Trait for embedding providers that can generate embeddings from text.
///
/// Implementations must be deterministic for a given configuration: the same
/// text always maps to the same vector, and every vector has
/// [`embedding_dimension`](EmbeddingProvider::embedding_dimension) components.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate the embedding for a single text
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let result = self.embed_texts(&[text.to_string()]).await?;
        result
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::embedding_gen("no embedding generated for text"))
    }

    /// Generate embeddings for multiple texts, preserving input order
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult>;

    /// Get the dimension of embeddings produced by this provider
    fn embedding_dimension(&self) -> usize;

    /// Get the name/identifier of this provider
    fn provider_name(&self) -> &str;

    /// Name of the model behind this provider. Recorded in index manifests.
    fn model_name(&self) -> &str;
}

/// Scales `vector` to unit L2 norm. Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// FastEmbed-based embedding provider using local ONNX models.
///
/// The loaded model is shared behind an `Arc`, so cloning a provider is cheap
/// and clones embed through the same model instance. Build one provider at
/// startup and hand clones to whoever needs it.
#[derive(Clone)]
pub struct FastEmbedProvider {
    config: EmbedConfig,
    model: Option<Arc<Mutex<TextEmbedding>>>,
    dimension: usize,
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("config", &self.config)
            .field("model", &self.model.is_some())
            .field("dimension", &self.dimension)
            .finish()
    }
}

fn fastembed_model(name: &str) -> Result<EmbeddingModel> {
    match name {
        "all-MiniLM-L6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "all-MiniLM-L12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        other => Err(EmbedError::invalid_config(format!(
            "no fastembed model named '{other}'"
        ))),
    }
}

fn run_model(model: &Mutex<TextEmbedding>, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
    let mut guard = model.lock().map_err(|_| EmbedError::LockPoisoned)?;
    guard.embed(texts, None).map_err(EmbedError::embedding_gen)
}

impl FastEmbedProvider {
    /// Creates a new uninitialized provider. Call [`initialize`](Self::initialize)
    /// before embedding, or use [`create`](Self::create).
    pub fn new(config: EmbedConfig) -> Self {
        Self {
            config,
            model: None,
            dimension: 384,
        }
    }

    /// Creates and initializes a provider in one step.
    pub async fn create(config: EmbedConfig) -> Result<Self> {
        let mut provider = Self::new(config);
        provider.initialize().await?;
        Ok(provider)
    }

    pub fn config(&self) -> &EmbedConfig {
        &self.config
    }

    /// Loads the model, downloading it into the cache directory on first use.
    pub async fn initialize(&mut self) -> Result<()> {
        self.config.validate()?;
        let model_kind = fastembed_model(self.config.model_name())?;

        tracing::info!(
            "Initializing FastEmbed provider for model: {}",
            self.config.model_name()
        );
        tokio::fs::create_dir_all(&self.config.cache_dir).await?;

        let config = self.config.clone();
        let (model, dimension) =
            tokio::task::spawn_blocking(move || -> Result<(TextEmbedding, usize)> {
                let init_options = InitOptions::new(model_kind)
                    .with_cache_dir(config.cache_dir.clone())
                    .with_show_download_progress(config.show_download_progress);

                let mut model = TextEmbedding::try_new(init_options).map_err(EmbedError::model_init)?;

                // Embed once to learn the dimension.
                let sample = model
                    .embed(vec!["dimension check".to_string()], None)
                    .map_err(EmbedError::model_init)?;
                let dimension = sample.first().map(|emb| emb.len()).unwrap_or(0);

                tracing::info!("Model loaded successfully. Dimension: {}", dimension);
                Ok((model, dimension))
            })
            .await??;

        self.model = Some(Arc::new(Mutex::new(model)));
        self.dimension = dimension;

        self.validate_model().await
    }

    /// Validate that the model is working correctly
    async fn validate_model(&self) -> Result<()> {
        let model = self
            .model
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| EmbedError::invalid_config("Model not initialized"))?;

        let validation =
            tokio::task::spawn_blocking(move || run_model(&model, vec!["validation test".to_string()]))
                .await??;

        let embedding = validation.first().ok_or_else(|| {
            EmbedError::invalid_config("Model validation failed: no embeddings generated")
        })?;

        if embedding.is_empty() || embedding.len() != self.dimension {
            return Err(EmbedError::invalid_config(format!(
                "Model validation failed: expected dimension {}, got {}",
                self.dimension,
                embedding.len()
            )));
        }

        if embedding.iter().any(|value| !value.is_finite()) {
            return Err(EmbedError::invalid_config(
                "Model validation failed: non-finite values in embedding",
            ));
        }

        tracing::debug!("Model validation passed for: {}", self.config.model_name());
        Ok(())
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        let model = self.model.as_ref().ok_or_else(|| {
            EmbedError::invalid_config("Model not initialized. Call initialize() first.")
        })?;

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size) {
            let batch = batch.to_vec();
            let model = Arc::clone(model);

            let mut embeddings = tokio::task::spawn_blocking(move || {
                tracing::debug!("Processing batch of {} texts", batch.len());
                run_model(&model, batch)
            })
            .await??;

            if self.config.normalize {
                embeddings.iter_mut().for_each(|e| l2_normalize(e));
            }
            all_embeddings.extend(embeddings);
        }

        if all_embeddings.len() != texts.len() {
            return Err(EmbedError::embedding_gen(format!(
                "model returned {} embeddings for {} texts",
                all_embeddings.len(),
                texts.len()
            )));
        }

        tracing::debug!("Generated {} embeddings", all_embeddings.len());
        Ok(EmbeddingResult::new(all_embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "fastembed"
    }

    fn model_name(&self) -> &str {
        self.config.model_name()
    }
}
