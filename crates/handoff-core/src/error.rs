use thiserror::Error;

use crate::domain::{TaskId, TaskState};

/// Errors surfaced to producers by the task queue.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue closed")]
    Closed,

    #[error("queue full (capacity={capacity})")]
    Full { capacity: usize },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Errors from the status ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("{0} was already submitted")]
    Duplicate(TaskId),

    #[error("{0} is not in the ledger")]
    NotFound(TaskId),

    #[error("invalid state transition for {task_id}: {from} -> {to}")]
    InvalidTransition {
        task_id: TaskId,
        from: TaskState,
        to: TaskState,
    },
}
