//! Fixed-window chunking of extracted document text.
//!
//! Retrieval works on small contiguous slices of a document rather than whole
//! documents. This module turns one document's text into those slices.
//!
//! The window is measured in characters (Unicode scalar values), never in bytes,
//! so a multi-byte character is never split. Windows do not overlap and ignore
//! sentence or paragraph boundaries: every character of the input lands in
//! exactly one chunk, and chunk order follows source order. Concatenating the
//! chunks of a document reproduces the document exactly.
//!
//! # Example
//!
//! ```
//! use lexi_context::text::TextChunker;
//! use std::num::NonZeroUsize;
//!
//! let chunker = TextChunker::new(NonZeroUsize::new(4).unwrap());
//! let chunks = chunker.get_chunks("notes.pdf", "Newton's laws");
//!
//! assert_eq!(chunks.len(), 4);
//! assert_eq!(chunks[0].chunk_text, "Newt");
//! assert_eq!(chunks[3].chunk_text, "s");
//!
//! let reconstructed: String = chunks.iter().map(|c| c.chunk_text.as_str()).collect();
//! assert_eq!(reconstructed, "Newton's laws");
//! ```
use serde::Serialize;
use std::num::NonZeroUsize;

/// Window size used when nothing else is configured, in characters.
pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = match NonZeroUsize::new(300) {
    Some(size) => size,
    None => unreachable!(),
};

/// Splits `text` into contiguous, non-overlapping slices of exactly `size`
/// characters. The final slice is shorter when the character count is not a
/// multiple of `size`. Empty input yields no slices.
pub fn chunk(text: &str, size: NonZeroUsize) -> Vec<&str> {
    let size = size.get();
    let mut chunks = Vec::with_capacity(text.len() / size + 1);
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == size {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        chunks.push(&text[start..]);
    }

    chunks
}

/// A single window of a document's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChunk {
    /// Identifier of the document the chunk came from.
    pub document: String,
    /// Position of this chunk within its document (0-indexed).
    pub sequence: usize,
    /// The text content of this chunk.
    pub chunk_text: String,
}

/// Chunker with a fixed character window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: NonZeroUsize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl TextChunker {
    pub fn new(chunk_size: NonZeroUsize) -> Self {
        Self { chunk_size }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size.get()
    }

    /// Borrowed windows of `content`, in source order.
    pub fn split<'a>(&self, content: &'a str) -> Vec<&'a str> {
        chunk(content, self.chunk_size)
    }

    /// Owned chunks tagged with the document they came from.
    pub fn get_chunks(&self, document: &str, content: &str) -> Vec<TextChunk> {
        self.split(content)
            .into_iter()
            .enumerate()
            .map(|(sequence, text)| TextChunk {
                document: document.to_string(),
                sequence,
                chunk_text: text.to_string(),
            })
            .collect()
    }
}
