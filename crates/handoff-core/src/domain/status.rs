//! Task state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// State stored in the status ledger.
///
/// State transitions:
/// - Queued -> InProgress -> Completed
/// - Queued -> InProgress -> Failed
///
/// No transition leaves a terminal state, and nothing moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    /// Accepted into the work channel, waiting for the worker.
    Queued,

    /// Currently being executed by the worker.
    #[serde(rename = "In Progress")]
    InProgress,

    /// The work item returned without error.
    Completed,

    /// The work item returned an error, panicked, or timed out.
    Failed,
}

impl TaskState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }

    /// Is `next` the one allowed step forward from `self`?
    pub fn can_advance_to(self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (TaskState::Queued, TaskState::InProgress)
                | (TaskState::InProgress, TaskState::Completed)
                | (TaskState::InProgress, TaskState::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        TaskStatus::from(self).as_str()
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answer to a status query.
///
/// Same members as [`TaskState`] plus `Unknown`, which is what a query returns
/// for an identifier the ledger has never seen. `Unknown` is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Queued,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Failed,
    Unknown,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Queued => "Queued",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
            TaskStatus::Failed => "Failed",
            TaskStatus::Unknown => "Unknown",
        }
    }

    /// Completed or Failed: a polling client can stop here.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl From<TaskState> for TaskStatus {
    fn from(state: TaskState) -> Self {
        match state {
            TaskState::Queued => TaskStatus::Queued,
            TaskState::InProgress => TaskStatus::InProgress,
            TaskState::Completed => TaskStatus::Completed,
            TaskState::Failed => TaskStatus::Failed,
        }
    }
}

impl From<Option<TaskState>> for TaskStatus {
    fn from(state: Option<TaskState>) -> Self {
        state.map_or(TaskStatus::Unknown, TaskStatus::from)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
