//! End-to-end answering: validate, retrieve, compose, generate.

use crate::generation::Generator;
use crate::response::{AskError, AskRequest, AskResponse, Query, validate};
use lexi_context::PromptComposer;
use lexi_retriever::retrieval::retriever::Retriever;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Where a request is in its lifecycle. `Failed` is reachable from any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Retrieving,
    Composing,
    Generating,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::Retrieving => "retrieving",
            Stage::Composing => "composing",
            Stage::Generating => "generating",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Answers questions against the current index.
///
/// Cloning is cheap; clones share the retriever's index handle and the
/// generator.
#[derive(Clone)]
pub struct AskService {
    retriever: Retriever,
    composer: PromptComposer,
    generator: Arc<dyn Generator>,
    timeout: Duration,
}

impl fmt::Debug for AskService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AskService")
            .field("retriever", &self.retriever)
            .field("composer", &self.composer)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl AskService {
    pub fn new(
        retriever: Retriever,
        composer: PromptComposer,
        generator: Arc<dyn Generator>,
        timeout: Duration,
    ) -> Self {
        Self {
            retriever,
            composer,
            generator,
            timeout,
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn ask(&self, request: &AskRequest) -> Result<AskResponse, AskError> {
        let mut stage = Stage::Validating;
        let result = self.run(request, &mut stage).await;
        match &result {
            Ok(_) => tracing::debug!("Request {}", Stage::Done),
            Err(e) => tracing::debug!("Request {} while {}: {}", Stage::Failed, stage, e),
        }
        result
    }

    async fn run(&self, request: &AskRequest, stage: &mut Stage) -> Result<AskResponse, AskError> {
        tracing::debug!("Request {}", stage);
        let query = validate(request)?;
        self.answer(query, stage).await
    }

    async fn answer(&self, query: Query, stage: &mut Stage) -> Result<AskResponse, AskError> {
        *stage = Stage::Retrieving;
        tracing::debug!("Request {}", stage);
        let retrieved = self.retriever.retrieve(&query.question).await.map_err(|e| {
            if e.is_index_unavailable() {
                tracing::error!("Cannot answer, index unavailable: {}", e);
            }
            AskError::from(e)
        })?;

        if retrieved.is_empty() {
            tracing::info!("No relevant content for question");
            return Ok(AskResponse::no_content());
        }

        *stage = Stage::Composing;
        tracing::debug!("Request {}", stage);
        let raw_answer = self
            .composer
            .bounded_context(retrieved.context())
            .trim()
            .to_string();
        let prompt = self
            .composer
            .compose(retrieved.context(), &query.question, query.mode);

        *stage = Stage::Generating;
        tracing::debug!("Request {}", stage);
        match self.generator.generate(&prompt, self.timeout).await {
            Ok(llm_answer) => Ok(AskResponse::Answered {
                raw_answer,
                llm_answer,
                mode_used: query.mode,
            }),
            Err(e) => {
                tracing::warn!("Generation failed, returning retrieved context only: {}", e);
                Ok(AskResponse::degraded(raw_answer))
            }
        }
    }
}
