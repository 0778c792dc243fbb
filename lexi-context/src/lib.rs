pub mod prompt;
pub mod text;

// Re-export the chunking and prompt entry points for external use
pub use prompt::{
    DEFAULT_CONTEXT_LIMIT, INSUFFICIENT_CONTEXT_ANSWER, Mode, ParseModeError, PromptComposer,
    compose, truncate_chars,
};
pub use text::{DEFAULT_CHUNK_SIZE, TextChunk, TextChunker, chunk};
