//! Persisted index generations.
//!
//! An index is two artifacts that only make sense together: the vector store
//! and the text mapping. Each build writes both into a fresh generation
//! directory and then switches `manifest.json` to point at it, so a reader
//! either sees the old pair or the new pair, never a mix.
//!
//! ```text
//! <index_dir>/
//!   manifest.json
//!   generations/<generation_id>/
//!       vectors.bin
//!       mapping.json
//! ```
//!
//! The manifest records blake3 checksums of both artifacts. Loading verifies
//! them along with the vector count and dimension, and reports any violation
//! as [`IndexUnavailable`](crate::error::RetrieverError::IndexUnavailable).

use crate::error::{Result, UnavailableReason};
use crate::retrieval::vector_index::FlatIndex;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod artifact_store;
pub mod vector_file;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const VECTORS_FILE: &str = "vectors.bin";
pub const MAPPING_FILE: &str = "mapping.json";
pub const GENERATIONS_DIR: &str = "generations";

/// Chunk count contributed by one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub id: String,
    pub chunks: usize,
}

/// Describes the active generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub generation_id: String,
    /// Increases by one with every build in this index directory
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    pub chunk_count: usize,
    pub dimension: usize,
    pub chunk_size: usize,
    pub embedding_model: String,
    /// blake3 of `vectors.bin`, hex encoded
    pub vectors_checksum: String,
    /// blake3 of `mapping.json`, hex encoded
    pub mapping_checksum: String,
    pub documents: Vec<DocumentEntry>,
}

/// A vector index paired with its text mapping.
///
/// Immutable once constructed. Queries share it through an `Arc` for as long
/// as they need it, which keeps a generation alive across a swap.
#[derive(Debug, Clone)]
pub struct LoadedIndex {
    index: FlatIndex,
    mapping: Vec<String>,
    manifest: Option<Manifest>,
}

impl LoadedIndex {
    /// Pairs an index with its mapping. The two must have the same length.
    pub fn new(index: FlatIndex, mapping: Vec<String>) -> Result<Self> {
        if index.len() != mapping.len() {
            return Err(UnavailableReason::LengthMismatch {
                vectors: index.len(),
                texts: mapping.len(),
            }
            .into());
        }
        Ok(Self {
            index,
            mapping,
            manifest: None,
        })
    }

    /// An index with no vectors. Every search against it comes back empty.
    pub fn empty(dimension: usize) -> Self {
        Self {
            index: FlatIndex::new(dimension),
            mapping: Vec::new(),
            manifest: None,
        }
    }

    pub(crate) fn with_manifest(mut self, manifest: Manifest) -> Self {
        self.manifest = Some(manifest);
        self
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn mapping(&self) -> &[String] {
        &self.mapping
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    pub fn generation_id(&self) -> Option<&str> {
        self.manifest.as_ref().map(|m| m.generation_id.as_str())
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RetrieverError;

    #[test]
    fn test_loaded_index_requires_matching_lengths() {
        let mut index = FlatIndex::new(2);
        index.add(&[0.0, 1.0]).unwrap();

        let err = LoadedIndex::new(index.clone(), vec![]).unwrap_err();
        assert!(matches!(
            err,
            RetrieverError::IndexUnavailable {
                reason: UnavailableReason::LengthMismatch { vectors: 1, texts: 0 }
            }
        ));

        let loaded = LoadedIndex::new(index, vec!["lens".into()]).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.generation_id(), None);
    }

    #[test]
    fn test_empty_index() {
        let loaded = LoadedIndex::empty(8);
        assert!(loaded.is_empty());
        assert_eq!(loaded.dimension(), 8);
    }
}
