//! Article generation workflow (the business logic handed to the queue).
//!
//! The assistant and publishing calls are simulated with a fixed latency so
//! the queue can be exercised without network access.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use handoff_core::{TaskId, WorkContext, WorkError, WorkItem};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("SEO phrase is required.")]
    MissingPhrase,
}

/// What a client posts to ask for an article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRequest {
    seo_phrase: String,
}

impl ArticleRequest {
    pub fn new(seo_phrase: impl Into<String>) -> Result<Self, RequestError> {
        let seo_phrase = seo_phrase.into().trim().to_string();
        if seo_phrase.is_empty() {
            return Err(RequestError::MissingPhrase);
        }
        Ok(Self { seo_phrase })
    }

    pub fn seo_phrase(&self) -> &str {
        &self.seo_phrase
    }
}

/// 202 Accepted body returned to the client right after submission.
#[derive(Debug, Clone, Serialize)]
pub struct Accepted {
    pub task_id: TaskId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CreateThread,
    Outline,
    Sections,
    Introduction,
    Format,
    Publish,
}

impl Stage {
    const ALL: [Stage; 6] = [
        Stage::CreateThread,
        Stage::Outline,
        Stage::Sections,
        Stage::Introduction,
        Stage::Format,
        Stage::Publish,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::CreateThread => "create_thread",
            Stage::Outline => "outline",
            Stage::Sections => "sections",
            Stage::Introduction => "introduction",
            Stage::Format => "format",
            Stage::Publish => "publish",
        };
        f.write_str(s)
    }
}

/// One article generation run, captured as a command object.
pub struct ArticleWorkflow {
    request: ArticleRequest,
    step_latency: Duration,
    fail_at: Option<Stage>,
}

impl ArticleWorkflow {
    pub fn new(request: ArticleRequest, step_latency: Duration) -> Self {
        Self {
            request,
            step_latency,
            fail_at: None,
        }
    }

    /// Make the simulated external call at `stage` fail.
    pub fn failing_at(mut self, stage: Stage) -> Self {
        self.fail_at = Some(stage);
        self
    }

    /// Section headers for the outline; a conclusion is always appended.
    fn outline(&self) -> Vec<String> {
        let mut headers: Vec<String> = self
            .request
            .seo_phrase
            .split_whitespace()
            .map(|word| format!("Why {word} matters"))
            .collect();
        headers.push("Conclusion".to_string());
        headers
    }

    async fn call(&self, ctx: &WorkContext, stage: Stage) -> Result<(), WorkError> {
        ctx.run_until_cancelled(tokio::time::sleep(self.step_latency))
            .await?;
        if self.fail_at == Some(stage) {
            return Err(WorkError::msg(format!(
                "{stage} step failed for {:?}",
                self.request.seo_phrase
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl WorkItem for ArticleWorkflow {
    async fn run(self: Box<Self>, ctx: WorkContext) -> Result<(), WorkError> {
        let task_id = ctx.task_id();
        for stage in Stage::ALL {
            if stage == Stage::Sections {
                for header in self.outline() {
                    debug!(%task_id, %header, "writing section");
                    self.call(&ctx, stage).await?;
                }
            } else {
                self.call(&ctx, stage).await?;
            }
            debug!(%task_id, %stage, "stage done");
        }
        info!(%task_id, phrase = self.request.seo_phrase(), "article published");
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "article_workflow"
    }
}
