//! A deterministic, model-free embedder.
//!
//! [`HashEmbedProvider`] maps each lowercase alphanumeric token to one of
//! `dimension` buckets with FNV-1a and adds a signed count there, then
//! L2-normalizes the result. Texts that share words land close together, which
//! is enough to exercise indexing and retrieval without downloading a model.

use crate::error::{EmbedError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingResult, l2_normalize};
use async_trait::async_trait;
use fnv::FnvHasher;
use std::hash::Hasher;

pub const HASH_MODEL_NAME: &str = "fnv-bag-of-words";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashEmbedProvider {
    dimension: usize,
}

impl Default for HashEmbedProvider {
    fn default() -> Self {
        Self { dimension: 64 }
    }
}

impl HashEmbedProvider {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(EmbedError::invalid_config("dimension must be at least 1"));
        }
        Ok(Self { dimension })
    }

    /// Embeds one text synchronously.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = FnvHasher::default();
            hasher.write(token.to_lowercase().as_bytes());
            let h = hasher.finish();
            let bucket = (h % self.dimension as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        l2_normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedProvider {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        let embeddings = texts.iter().map(|t| self.embed_sync(t)).collect();
        Ok(EmbeddingResult {
            embeddings,
            dimension: self.dimension,
        })
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "hash"
    }

    fn model_name(&self) -> &str {
        HASH_MODEL_NAME
    }
}
