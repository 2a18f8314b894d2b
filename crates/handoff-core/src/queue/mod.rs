//! Queue module: status ledger, bounded work channel, and the `TaskQueue`
//! handle that producers and status readers share.

pub mod channel;
pub mod ledger;
pub mod work;

pub use channel::{QueuedWork, WorkReceiver, WorkSender, work_channel};
pub use ledger::StatusLedger;
pub use work::{WorkContext, WorkError, WorkFn, WorkItem, work_fn};

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::app::status::StatusCounts;
use crate::domain::{TaskId, TaskRecord, TaskStatus};
use crate::error::QueueError;

/// How often an external client is expected to poll for status.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Shortest interval `poll_until_terminal` will tick at.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Handle for submitting work and querying its status.
///
/// Built once by `AppBuilder` and cloned into every request handler.
/// Clones share the same ledger, channel, and shutdown token.
///
/// Design intent:
/// - `submit` writes `Queued`; every later transition belongs to the worker.
/// - Status reads go straight to the ledger and never touch the channel.
#[derive(Clone)]
pub struct TaskQueue {
    ledger: Arc<StatusLedger>,
    sender: WorkSender,
    shutdown: CancellationToken,
}

impl TaskQueue {
    pub fn new(ledger: Arc<StatusLedger>, sender: WorkSender, shutdown: CancellationToken) -> Self {
        Self {
            ledger,
            sender,
            shutdown,
        }
    }

    /// Register `task_id` as `Queued` and hand `item` to the worker.
    ///
    /// Waits while the channel is full. Returns once the item is accepted,
    /// not once it has run. Fails with `QueueError::Closed` after shutdown,
    /// including a shutdown that arrives while waiting for space; in that
    /// case the `Queued` entry is withdrawn again.
    pub async fn submit<W: WorkItem>(&self, item: W, task_id: TaskId) -> Result<(), QueueError> {
        let work = self.register(item, task_id)?;

        let sent = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(QueueError::Closed),
            sent = self.sender.send(work) => sent,
        };
        self.settle(task_id, sent)
    }

    /// Like [`submit`](Self::submit) but fails with `QueueError::Full`
    /// instead of waiting.
    pub fn try_submit<W: WorkItem>(&self, item: W, task_id: TaskId) -> Result<(), QueueError> {
        let work = self.register(item, task_id)?;
        let sent = self.sender.try_send(work);
        self.settle(task_id, sent)
    }

    fn register<W: WorkItem>(&self, item: W, task_id: TaskId) -> Result<QueuedWork, QueueError> {
        if self.shutdown.is_cancelled() {
            return Err(QueueError::Closed);
        }
        self.ledger.register(task_id)?;
        Ok(QueuedWork::new(task_id, Box::new(item)))
    }

    fn settle(&self, task_id: TaskId, sent: Result<(), QueueError>) -> Result<(), QueueError> {
        match sent {
            Ok(()) => {
                debug!(%task_id, pending = self.sender.pending(), "task queued");
                Ok(())
            }
            Err(err) => {
                self.ledger.forget_queued(task_id);
                debug!(%task_id, error = %err, "task rejected");
                Err(err)
            }
        }
    }

    /// Current status of `task_id`; `Unknown` if it was never submitted.
    pub fn get_status(&self, task_id: TaskId) -> TaskStatus {
        self.ledger.status(task_id)
    }

    pub fn record(&self, task_id: TaskId) -> Option<TaskRecord> {
        self.ledger.record(task_id)
    }

    pub fn counts(&self) -> StatusCounts {
        self.ledger.counts()
    }

    /// Poll every `interval` until the task is terminal (or unknown).
    ///
    /// This is what an external client does against the status endpoint.
    /// An `interval` below [`MIN_POLL_INTERVAL`] is raised to it.
    pub async fn poll_until_terminal(&self, task_id: TaskId, interval: Duration) -> TaskStatus {
        let mut ticker = tokio::time::interval(interval.max(MIN_POLL_INTERVAL));
        loop {
            ticker.tick().await;
            let status = self.get_status(task_id);
            if status.is_terminal() || status == TaskStatus::Unknown {
                return status;
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    /// Items accepted but not yet picked up by the worker.
    pub fn pending(&self) -> usize {
        self.sender.pending()
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.sender.is_closed()
    }

    /// Stop accepting work and tell the worker to exit once idle.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn ledger(&self) -> &Arc<StatusLedger> {
        &self.ledger
    }
}
