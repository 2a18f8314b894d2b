//! Task record: one status ledger entry.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{TaskId, TaskState};
use crate::error::LedgerError;

/// Current state of one submitted task plus timestamps for observability.
///
/// Design:
/// - This is the single source of truth for a task's state.
/// - All state transitions go through `advance`, which refuses anything but
///   the next forward step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub state: TaskState,

    /// Message of the error that moved the task to `Failed`.
    pub last_error: Option<String>,

    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn new(task_id: TaskId, now: DateTime<Utc>) -> Self {
        Self {
            task_id,
            state: TaskState::Queued,
            last_error: None,
            queued_at: now,
            started_at: None,
            finished_at: None,
            updated_at: now,
        }
    }

    /// Queued -> InProgress.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.advance(TaskState::InProgress, now)?;
        self.started_at = Some(now);
        Ok(())
    }

    /// InProgress -> Completed.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.advance(TaskState::Completed, now)?;
        self.finished_at = Some(now);
        Ok(())
    }

    /// InProgress -> Failed.
    pub fn fail(&mut self, error: String, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.advance(TaskState::Failed, now)?;
        self.finished_at = Some(now);
        self.last_error = Some(error);
        Ok(())
    }

    fn advance(&mut self, next: TaskState, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if !self.state.can_advance_to(next) {
            return Err(LedgerError::InvalidTransition {
                task_id: self.task_id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.updated_at = now;
        Ok(())
    }
}
