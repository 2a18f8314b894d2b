//! WorkItem - バックグラウンドで実行される処理単位
//!
//! # 学習ポイント
//! - `self: Box<Self>` による FnOnce 的な trait（実行は 1 回きり、所有権ごと消費）
//! - クロージャを newtype で包んで trait を実装する（`WorkFn`）
//! - CancellationToken による協調的キャンセル

use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::TaskId;

/// What a work item reports back when it does not succeed.
///
/// The queue only looks at whether this is `Ok` or `Err`; the message ends up
/// in the task record and the worker log.
#[derive(Debug, thiserror::Error)]
pub enum WorkError {
    #[error("cancelled")]
    Cancelled,

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl WorkError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// Execution context handed to a running work item.
///
/// The token is a child of the process-wide shutdown token: it fires on
/// shutdown, and also when the worker gives up on this item (timeout).
/// The worker never interrupts an item on its own; the item checks the token.
#[derive(Debug, Clone)]
pub struct WorkContext {
    task_id: TaskId,
    cancel: CancellationToken,
}

impl WorkContext {
    pub fn new(task_id: TaskId, cancel: CancellationToken) -> Self {
        Self { task_id, cancel }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run `fut` unless cancellation arrives first.
    pub async fn run_until_cancelled<F: Future>(&self, fut: F) -> Result<F::Output, WorkError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(WorkError::Cancelled),
            out = fut => Ok(out),
        }
    }
}

/// An executable unit of work submitted for background execution.
///
/// # 使用例
/// ```ignore
/// struct SendReport { to: String }
///
/// #[async_trait]
/// impl WorkItem for SendReport {
///     async fn run(self: Box<Self>, ctx: WorkContext) -> Result<(), WorkError> {
///         mailer::send(&self.to).await.map_err(|e| WorkError::msg(e.to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait WorkItem: Send + 'static {
    async fn run(self: Box<Self>, ctx: WorkContext) -> Result<(), WorkError>;

    /// Label used in logs.
    fn kind(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Adapter that turns an async closure into a [`WorkItem`].
pub struct WorkFn<F> {
    f: F,
    kind: &'static str,
}

/// Wrap a closure `|ctx| async move { ... }` as a work item.
pub fn work_fn<F, Fut>(f: F) -> WorkFn<F>
where
    F: FnOnce(WorkContext) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), WorkError>> + Send + 'static,
{
    WorkFn { f, kind: "work_fn" }
}

impl<F> WorkFn<F> {
    pub fn named(mut self, kind: &'static str) -> Self {
        self.kind = kind;
        self
    }
}

#[async_trait]
impl<F, Fut> WorkItem for WorkFn<F>
where
    F: FnOnce(WorkContext) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), WorkError>> + Send + 'static,
{
    async fn run(self: Box<Self>, ctx: WorkContext) -> Result<(), WorkError> {
        let WorkFn { f, .. } = *self;
        f(ctx).await
    }

    fn kind(&self) -> &'static str {
        self.kind
    }
}
