//! Request and response payloads, and the error taxonomy callers see.

use lexi_context::{Mode, ParseModeError};
use lexi_retriever::{RetrieverError, UnavailableReason};
use rmcp::schemars;
use serde::{Deserialize, Serialize};

/// Message returned when retrieval finds nothing to answer from.
pub const NO_CONTENT_MESSAGE: &str = "no relevant content found";

/// Stands in for the generated answer when the generator fails or times out.
pub const DEGRADED_ANSWER: &str = "Could not enhance the answer. Try again later.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AskRequest {
    #[schemars(description = "The question to answer from the indexed material")]
    #[serde(default)]
    pub question: String,
    #[schemars(description = "Answer length: 'brief' (default) or 'detailed'")]
    #[serde(default)]
    pub mode: Option<String>,
}

impl AskRequest {
    pub fn new<S: Into<String>>(question: S) -> Self {
        Self {
            question: question.into(),
            mode: None,
        }
    }

    pub fn with_mode<S: Into<String>>(mut self, mode: S) -> Self {
        self.mode = Some(mode.into());
        self
    }
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub question: String,
    pub mode: Mode,
}

/// Rejects empty questions and unknown modes.
pub fn validate(request: &AskRequest) -> Result<Query, ValidationError> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(ValidationError::EmptyQuestion);
    }
    let mode = match &request.mode {
        None => Mode::default(),
        Some(mode) => mode.parse()?,
    };
    Ok(Query {
        question: question.to_string(),
        mode,
    })
}

/// The three successful outcomes of a request. Each has its own shape, and
/// callers tell them apart by which fields are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AskResponse {
    Answered {
        raw_answer: String,
        llm_answer: String,
        mode_used: Mode,
    },
    /// Retrieval succeeded but generation did not.
    Degraded {
        raw_answer: String,
        llm_answer: String,
    },
    NoContent {
        message: String,
    },
}

impl AskResponse {
    pub fn no_content() -> Self {
        Self::NoContent {
            message: NO_CONTENT_MESSAGE.to_string(),
        }
    }

    pub fn degraded(raw_answer: String) -> Self {
        Self::Degraded {
            raw_answer,
            llm_answer: DEGRADED_ANSWER.to_string(),
        }
    }

    pub fn raw_answer(&self) -> Option<&str> {
        match self {
            Self::Answered { raw_answer, .. } | Self::Degraded { raw_answer, .. } => Some(raw_answer),
            Self::NoContent { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Question cannot be empty.")]
    EmptyQuestion,
    #[error(transparent)]
    InvalidMode(#[from] ParseModeError),
}

/// Why a request failed outright.
#[derive(Debug, thiserror::Error)]
pub enum AskError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("index unavailable: {0}")]
    IndexUnavailable(UnavailableReason),

    #[error("unexpected error: {0}")]
    Unexpected(anyhow::Error),
}

impl From<RetrieverError> for AskError {
    fn from(e: RetrieverError) -> Self {
        match e {
            RetrieverError::IndexUnavailable { reason } => Self::IndexUnavailable(reason),
            other => Self::Unexpected(other.into()),
        }
    }
}

/// Body of a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    pub detail: String,
}

impl AskError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::IndexUnavailable(_) => 503,
            Self::Unexpected(_) => 500,
        }
    }

    /// What the caller is told. Only validation errors are specific; the rest
    /// never expose internals.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::IndexUnavailable(_) => {
                "The document index is not available. Build it with `lexi-retriever index` and try again."
                    .to_string()
            }
            Self::Unexpected(_) => "Internal server error.".to_string(),
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            status: self.status_code(),
            detail: self.public_message(),
        }
    }
}
