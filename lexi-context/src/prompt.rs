//! Prompt composition for the answer generator.
//!
//! A prompt is a fixed instruction block chosen by [`Mode`], followed by the
//! retrieved context and the student's question. The context is capped at
//! [`DEFAULT_CONTEXT_LIMIT`] characters (configurable on [`PromptComposer`])
//! regardless of mode, which keeps the prompt size bounded no matter how many
//! chunks were retrieved.
//!
//! ```
//! use lexi_context::{Mode, compose};
//!
//! let prompt = compose("F = ma relates force and mass.", "What is Newton's second law?", Mode::Brief);
//! assert!(prompt.contains("Summarize in 5-6 lines"));
//! assert!(prompt.contains("Question: What is Newton's second law?"));
//! ```
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum number of context characters inserted into a prompt.
pub const DEFAULT_CONTEXT_LIMIT: usize = 2000;

/// Sentence the detailed prompt asks the generator to emit when the context is
/// insufficient. Callers may match on it, so it must stay byte-for-byte stable.
pub const INSUFFICIENT_CONTEXT_ANSWER: &str =
    "The answer is not available in the provided material.";

const BRIEF_INSTRUCTIONS: &str = "\
You are a helpful assistant for JEE students. Based on the following content extracted from a textbook, write an answer that follows these instructions:
- Give first priority to the textbook content; rely on general knowledge only when it is not enough.
- Fix grammar and clarity issues. Include the formula if one appears in the content; otherwise supply the relevant formula yourself.
- Summarize in 5-6 lines of simple language.";

const DETAILED_INSTRUCTIONS: &str = "\
You are a helpful assistant for JEE students. Based on the following content extracted from a textbook, write an answer that follows these instructions:
- Give first priority to the textbook content; rely on general knowledge only when it is not enough.
- Fix grammar and clarity issues. Include the formula if one appears in the content; otherwise supply the relevant formula yourself.
- Provide a detailed explanation in 15-17 lines, well-structured and easy to understand.";

/// How much the generator should write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// A 5-6 line summary.
    #[default]
    Brief,
    /// A 15-17 line structured explanation with an explicit fallback sentence.
    Detailed,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Brief => "brief",
            Mode::Detailed => "detailed",
        }
    }

    fn instructions(&self) -> String {
        match self {
            Mode::Brief => BRIEF_INSTRUCTIONS.to_string(),
            Mode::Detailed => format!(
                "{DETAILED_INSTRUCTIONS}\nIf the content is insufficient, respond with: '{INSUFFICIENT_CONTEXT_ANSWER}'"
            ),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a mode string is neither `brief` nor `detailed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError {
    pub value: String,
}

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid mode: '{}'. Use 'brief' or 'detailed'.",
            self.value
        )
    }
}

impl std::error::Error for ParseModeError {}

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "brief" => Ok(Mode::Brief),
            "detailed" => Ok(Mode::Detailed),
            _ => Err(ParseModeError {
                value: s.to_string(),
            }),
        }
    }
}

/// Returns the longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Builds generator prompts with a bounded context section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptComposer {
    context_limit: usize,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_LIMIT)
    }
}

impl PromptComposer {
    pub fn new(context_limit: usize) -> Self {
        Self { context_limit }
    }

    pub fn context_limit(&self) -> usize {
        self.context_limit
    }

    /// The portion of `context` that will actually be placed in the prompt.
    pub fn bounded_context<'a>(&self, context: &'a str) -> &'a str {
        truncate_chars(context, self.context_limit)
    }

    pub fn compose(&self, context: &str, question: &str, mode: Mode) -> String {
        let content = self.bounded_context(context);
        format!(
            "{instructions}\n\nContent:\n{content}\n\nQuestion: {question}\n\nAnswer:",
            instructions = mode.instructions(),
        )
    }
}

/// Composes a prompt with the default context limit.
pub fn compose(context: &str, question: &str, mode: Mode) -> String {
    PromptComposer::default().compose(context, question, mode)
}
