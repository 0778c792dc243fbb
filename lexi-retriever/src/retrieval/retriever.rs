//! Query-side retrieval: embed the question, search, resolve ordinals to text.

use crate::error::{Result, UnavailableReason};
use crate::retrieval::index_handle::IndexHandle;
use crate::retrieval::vector_index::FlatIndex;
use crate::storage::LoadedIndex;
use lexi_embed::EmbeddingProvider;
use serde::Serialize;
use std::sync::Arc;

pub const DEFAULT_TOP_K: usize = 3;

/// One retrieved chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub ordinal: usize,
    pub distance: f32,
    pub text: String,
}

/// Retrieved chunks nearest first, and their texts joined with single spaces.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub chunks: Vec<RetrievedChunk>,
    pub context: String,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn context(&self) -> &str {
        &self.context
    }
}

/// Finds the `k` chunks nearest to `query`.
///
/// An empty index yields an empty result rather than an error. Ordinals that
/// fall outside `mapping` are dropped with a warning.
pub async fn retrieve(
    query: &str,
    embedder: &dyn EmbeddingProvider,
    index: &FlatIndex,
    mapping: &[String],
    k: usize,
) -> Result<RetrievalResult> {
    if index.is_empty() || k == 0 {
        return Ok(RetrievalResult::default());
    }

    let query_vector = embedder.embed_text(query).await?;
    if query_vector.len() != index.dimension() {
        tracing::error!(
            "Query embedding has dimension {} but the index was built with {}; rebuild the index with the current model",
            query_vector.len(),
            index.dimension()
        );
        return Err(UnavailableReason::DimensionMismatch {
            expected: index.dimension(),
            actual: query_vector.len(),
        }
        .into());
    }

    let mut chunks = Vec::with_capacity(k);
    for hit in index.search(&query_vector, k)? {
        match mapping.get(hit.ordinal) {
            Some(text) => chunks.push(RetrievedChunk {
                ordinal: hit.ordinal,
                distance: hit.distance,
                text: text.clone(),
            }),
            None => tracing::warn!(
                "Ordinal {} has no text in a mapping of {} entries",
                hit.ordinal,
                mapping.len()
            ),
        }
    }

    let context = chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    tracing::debug!("Retrieved {} chunks for query", chunks.len());
    Ok(RetrievalResult { chunks, context })
}

/// Retrieval bound to an embedder, an index handle and a neighbor count.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    handle: Arc<IndexHandle>,
    top_k: usize,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("embedder", &self.embedder.provider_name())
            .field("top_k", &self.top_k)
            .finish()
    }
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, handle: Arc<IndexHandle>) -> Self {
        Self {
            embedder,
            handle,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn handle(&self) -> &Arc<IndexHandle> {
        &self.handle
    }

    /// Retrieves against whatever index is current when called.
    pub async fn retrieve(&self, query: &str) -> Result<RetrievalResult> {
        let snapshot = self.handle.snapshot().await?;
        self.retrieve_from(&snapshot, query).await
    }

    pub async fn retrieve_from(&self, index: &LoadedIndex, query: &str) -> Result<RetrievalResult> {
        if let Some(manifest) = index.manifest() {
            if manifest.embedding_model != self.embedder.model_name() {
                tracing::warn!(
                    "Index generation {} was built with {}, querying with {}",
                    manifest.generation_id,
                    manifest.embedding_model,
                    self.embedder.model_name()
                );
            }
        }
        retrieve(
            query,
            self.embedder.as_ref(),
            index.index(),
            index.mapping(),
            self.top_k,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RetrieverError;
    use lexi_embed::HashEmbedProvider;

    async fn index_for(embedder: &HashEmbedProvider, texts: &[&str]) -> (FlatIndex, Vec<String>) {
        let mut index = FlatIndex::new(embedder.embedding_dimension());
        for text in texts {
            index.add(&embedder.embed_text(text).await.unwrap()).unwrap();
        }
        (index, texts.iter().map(|t| t.to_string()).collect())
    }

    #[tokio::test]
    async fn test_nearest_text_first_and_joined() {
        let embedder = HashEmbedProvider::new(128).unwrap();
        let (index, mapping) = index_for(
            &embedder,
            &["the mole concept", "lens formula for optics", "mole fraction of a solution"],
        )
        .await;

        let result = retrieve("lens formula", &embedder, &index, &mapping, 1)
            .await
            .unwrap();
        assert_eq!(result.chunks.len(), 1);
        assert_eq!(result.chunks[0].ordinal, 1);
        assert_eq!(result.context, "lens formula for optics");

        let result = retrieve("lens formula", &embedder, &index, &mapping, 3)
            .await
            .unwrap();
        assert_eq!(result.chunks.len(), 3);
        let expected: Vec<&str> = result.chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(result.context, expected.join(" "));
    }

    #[tokio::test]
    async fn test_empty_index_gives_empty_result() {
        let embedder = HashEmbedProvider::default();
        let result = retrieve("anything", &embedder, &FlatIndex::new(64), &[], 3)
            .await
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(result.context(), "");
    }

    #[tokio::test]
    async fn test_stale_ordinals_are_skipped() {
        let embedder = HashEmbedProvider::new(16).unwrap();
        let (index, mut mapping) = index_for(&embedder, &["alpha", "beta"]).await;
        mapping.truncate(1);

        let result = retrieve("beta", &embedder, &index, &mapping, 2).await.unwrap();
        assert_eq!(result.chunks.len(), 1);
        assert_eq!(result.context, "alpha");
    }

    #[tokio::test]
    async fn test_model_mismatch_is_unavailable() {
        let small = HashEmbedProvider::new(8).unwrap();
        let large = HashEmbedProvider::new(16).unwrap();
        let (index, mapping) = index_for(&small, &["alpha"]).await;

        let err = retrieve("alpha", &large, &index, &mapping, 3).await.unwrap_err();
        assert!(matches!(
            err,
            RetrieverError::IndexUnavailable {
                reason: UnavailableReason::DimensionMismatch { expected: 8, actual: 16 }
            }
        ));
    }

    #[tokio::test]
    async fn test_retriever_uses_handle() {
        let embedder = HashEmbedProvider::new(32).unwrap();
        let (index, mapping) = index_for(&embedder, &["gravitation", "thermodynamics"]).await;
        let handle = Arc::new(IndexHandle::in_memory(LoadedIndex::new(index, mapping).unwrap()));

        let retriever = Retriever::new(Arc::new(embedder), handle).with_top_k(1);
        let result = retriever.retrieve("thermodynamics").await.unwrap();
        assert_eq!(result.context, "thermodynamics");
    }
}
