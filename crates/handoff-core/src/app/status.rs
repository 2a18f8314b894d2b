//! Status - ステータス問い合わせ用のビュー
//!
//! HTTP 層などの呼び出し側がそのままシリアライズして返せる形にしてあります。

use serde::{Deserialize, Serialize};

use crate::domain::{TaskId, TaskState, TaskStatus};

/// Number of ledger entries in each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub queued: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn add(&mut self, state: TaskState) {
        match state {
            TaskState::Queued => self.queued += 1,
            TaskState::InProgress => self.in_progress += 1,
            TaskState::Completed => self.completed += 1,
            TaskState::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.queued + self.in_progress + self.completed + self.failed
    }
}

/// Response body for a status query: `{"task_id": "...", "status": "..."}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub task_id: TaskId,
    pub status: TaskStatus,
}

impl StatusReport {
    pub fn new(task_id: TaskId, status: TaskStatus) -> Self {
        Self { task_id, status }
    }
}
