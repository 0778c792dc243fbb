//! Turns extracted documents into a vector index and its text mapping.

use crate::error::{Result, RetrieverError};
use crate::extract::{Document, Extractor, collect_documents};
use crate::retrieval::chunking_strategy::{ChunkingStrategy, IndexConfig};
use crate::retrieval::vector_index::FlatIndex;
use crate::storage::artifact_store::ArtifactStore;
use crate::storage::{DocumentEntry, LoadedIndex};
use lexi_embed::EmbeddingProvider;
use std::path::Path;
use std::sync::Arc;

/// Output of a build, not yet persisted.
///
/// `mapping[i]` is the text of the vector with ordinal `i`. Ordinals run over
/// all documents in the order they were supplied.
#[derive(Debug, Clone)]
pub struct BuiltIndex {
    pub index: FlatIndex,
    pub mapping: Vec<String>,
    pub documents: Vec<DocumentEntry>,
}

impl BuiltIndex {
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}

/// Chunks and embeds `documents`, one embedding batch per document.
///
/// Fails with [`RetrieverError::NoContent`] when no document yields a chunk,
/// so an empty corpus is never mistaken for a usable index.
pub async fn build(
    documents: &[Document],
    strategy: &ChunkingStrategy,
    embedder: &dyn EmbeddingProvider,
) -> Result<BuiltIndex> {
    let mut index = FlatIndex::new(embedder.embedding_dimension());
    let mut mapping = Vec::new();
    let mut entries = Vec::with_capacity(documents.len());

    for document in documents {
        let texts: Vec<String> = strategy
            .chunk_content(&document.id, &document.text)
            .into_iter()
            .map(|c| c.chunk_text)
            .collect();

        tracing::info!("{}: {} chunks", document.id, texts.len());
        entries.push(DocumentEntry {
            id: document.id.clone(),
            chunks: texts.len(),
        });
        if texts.is_empty() {
            continue;
        }

        let embedded = embedder.embed_texts(&texts).await?;
        if embedded.len() != texts.len() {
            return Err(lexi_embed::EmbedError::embedding_gen(format!(
                "{} embeddings returned for {} chunks of {}",
                embedded.len(),
                texts.len(),
                document.id
            ))
            .into());
        }
        for vector in &embedded.embeddings {
            index.add(vector)?;
        }
        mapping.extend(texts);
    }

    if mapping.is_empty() {
        tracing::warn!("Build over {} documents produced no chunks", documents.len());
        return Err(RetrieverError::NoContent);
    }

    Ok(BuiltIndex {
        index,
        mapping,
        documents: entries,
    })
}

/// Extracts, builds, persists and activates a new generation from `docs_dir`.
pub async fn index_directory(
    config: &IndexConfig,
    docs_dir: &Path,
    embedder: Arc<dyn EmbeddingProvider>,
    extractor: Arc<dyn Extractor>,
) -> Result<LoadedIndex> {
    let strategy = ChunkingStrategy::new(config);

    let documents = {
        let strategy = strategy.clone();
        let docs_dir = docs_dir.to_path_buf();
        tokio::task::spawn_blocking(move || {
            collect_documents(&docs_dir, &strategy, extractor.as_ref())
        })
        .await??
    };

    let built = build(&documents, &strategy, embedder.as_ref()).await?;
    tracing::info!(
        "Built index with {} chunks from {} documents",
        built.len(),
        built.documents.len()
    );

    let store = ArtifactStore::new(&config.index_dir);
    let chunk_size = strategy.chunk_size();
    let model = embedder.model_name().to_string();
    tokio::task::spawn_blocking(move || store.persist(built, chunk_size, &model)).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexi_embed::HashEmbedProvider;
    use std::num::NonZeroUsize;

    fn doc(id: &str, text: &str) -> Document {
        Document {
            id: id.to_string(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_ordinals_span_documents_in_order() {
        let strategy = ChunkingStrategy::new(
            &IndexConfig::default().with_chunk_size(NonZeroUsize::new(4).unwrap()),
        );
        let embedder = HashEmbedProvider::new(16).unwrap();
        let docs = [doc("a.txt", "abcdefg"), doc("b.txt", ""), doc("c.txt", "wxyz")];

        let built = build(&docs, &strategy, &embedder).await.unwrap();

        assert_eq!(built.mapping, vec!["abcd", "efg", "wxyz"]);
        assert_eq!(built.index.len(), 3);
        assert_eq!(built.index.dimension(), 16);
        assert_eq!(
            built.index.vector(2).unwrap(),
            embedder.embed_sync("wxyz").as_slice()
        );
        let counts: Vec<usize> = built.documents.iter().map(|d| d.chunks).collect();
        assert_eq!(counts, vec![2, 0, 1]);
    }

    #[tokio::test]
    async fn test_empty_corpus_is_no_content() {
        let strategy = ChunkingStrategy::new(&IndexConfig::default());
        let embedder = HashEmbedProvider::default();

        let err = build(&[], &strategy, &embedder).await.unwrap_err();
        assert!(matches!(err, RetrieverError::NoContent));

        let err = build(&[doc("blank.txt", "Reprint 2024-25")], &strategy, &embedder)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrieverError::NoContent));
    }

    #[tokio::test]
    async fn test_single_exact_chunk() {
        let strategy = ChunkingStrategy::new(&IndexConfig::default());
        let embedder = HashEmbedProvider::default();
        let text = "m".repeat(300);

        let built = build(&[doc("one.txt", &text)], &strategy, &embedder).await.unwrap();
        assert_eq!(built.len(), 1);
        assert_eq!(built.index.len(), 1);
    }
}
