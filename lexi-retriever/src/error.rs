//! Error types for indexing and retrieval

use lexi_embed::EmbedError;
use std::path::PathBuf;

/// Result type for retriever operations.
pub type Result<T> = std::result::Result<T, RetrieverError>;

/// Why a persisted index could not be served.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnavailableReason {
    #[error("no index has been built")]
    NotFound,

    #[error("index artifacts are corrupt: {0}")]
    Corrupt(String),

    #[error("checksum mismatch in {artifact}")]
    ChecksumMismatch { artifact: String },

    #[error("vector store holds {vectors} vectors but mapping holds {texts} texts")]
    LengthMismatch { vectors: usize, texts: usize },

    #[error("dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum RetrieverError {
    /// The build produced zero chunks across all documents.
    #[error("no content to index")]
    NoContent,

    /// The index is missing, corrupt or inconsistent. Distinct from an empty
    /// retrieval, which is not an error.
    #[error("index unavailable: {reason}")]
    IndexUnavailable { reason: UnavailableReason },

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    #[error("failed to extract text from {}: {message}", path.display())]
    Extraction { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl RetrieverError {
    pub fn unavailable(reason: UnavailableReason) -> Self {
        Self::IndexUnavailable { reason }
    }

    pub fn corrupt<S: Into<String>>(message: S) -> Self {
        Self::unavailable(UnavailableReason::Corrupt(message.into()))
    }

    pub fn is_index_unavailable(&self) -> bool {
        matches!(self, Self::IndexUnavailable { .. })
    }
}

impl From<UnavailableReason> for RetrieverError {
    fn from(reason: UnavailableReason) -> Self {
        Self::unavailable(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(RetrieverError::NoContent.to_string(), "no content to index");

        let err = RetrieverError::unavailable(UnavailableReason::LengthMismatch {
            vectors: 4,
            texts: 3,
        });
        assert!(err.is_index_unavailable());
        assert_eq!(
            err.to_string(),
            "index unavailable: vector store holds 4 vectors but mapping holds 3 texts"
        );

        let err = RetrieverError::Extraction {
            path: PathBuf::from("docs/ch1.pdf"),
            message: "encrypted".into(),
        };
        assert_eq!(err.to_string(), "failed to extract text from docs/ch1.pdf: encrypted");
    }
}
