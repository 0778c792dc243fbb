use lexi_context::{DEFAULT_CHUNK_SIZE, TextChunk, TextChunker};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// Phrases printed on every page of the bundled textbooks that carry no content.
pub const DEFAULT_NOISE_PHRASES: &[&str] = &["Reprint 2024-25"];

/// Document extensions accepted by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &["pdf", "txt", "md"];

/// Configuration for building and locating an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory holding the manifest and generations
    pub index_dir: PathBuf,
    /// Size of each chunk in characters
    pub chunk_size: NonZeroUsize,
    /// Phrases removed from extracted text before chunking
    pub noise_phrases: Vec<String>,
    /// File extensions (without the dot, lowercase) treated as documents
    pub extensions: Vec<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from(".lexi"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            noise_phrases: DEFAULT_NOISE_PHRASES.iter().map(|s| s.to_string()).collect(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl IndexConfig {
    pub fn new<P: Into<PathBuf>>(index_dir: P) -> Self {
        Self {
            index_dir: index_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: NonZeroUsize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_noise_phrases(mut self, phrases: Vec<String>) -> Self {
        self.noise_phrases = phrases;
        self
    }
}

/// Chunking policy for indexed documents. Delegates the splitting itself to
/// lexi-context.
#[derive(Debug, Clone)]
pub struct ChunkingStrategy {
    chunker: TextChunker,
    noise_phrases: Vec<String>,
    extensions: Vec<String>,
}

impl ChunkingStrategy {
    pub fn new(config: &IndexConfig) -> Self {
        Self {
            chunker: TextChunker::new(config.chunk_size),
            noise_phrases: config
                .noise_phrases
                .iter()
                .filter(|p| !p.is_empty())
                .cloned()
                .collect(),
            extensions: config.extensions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunker.chunk_size()
    }

    /// Removes every configured noise phrase from `text`.
    pub fn clean(&self, text: &str) -> String {
        self.noise_phrases
            .iter()
            .fold(text.to_string(), |acc, phrase| acc.replace(phrase.as_str(), ""))
    }

    /// Cleans and chunks one document's text.
    pub fn chunk_content(&self, document: &str, content: &str) -> Vec<TextChunk> {
        let chunks = self.chunker.get_chunks(document, &self.clean(content));

        tracing::debug!(
            "Chunked {} into {} chunks (size: {})",
            document,
            chunks.len(),
            self.chunk_size()
        );

        chunks
    }

    /// Whether `path` looks like a document this index accepts.
    pub fn should_index_file(&self, path: &Path) -> bool {
        if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
            if filename.starts_with('.') {
                return false;
            }
        }

        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}
