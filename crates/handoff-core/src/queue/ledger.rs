//! Status ledger: task id -> current state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::app::status::StatusCounts;
use crate::domain::{TaskId, TaskRecord, TaskState, TaskStatus};
use crate::error::LedgerError;
use crate::ports::Clock;

/// Concurrency-safe map from task id to its record.
///
/// Design:
/// - Sharded map, so producers registering tasks, the worker advancing them
///   and readers polling them never contend on one global lock.
/// - Every operation touches a single entry; no lock is held across `.await`.
/// - Entries are only removed by `forget_queued` (failed submission) and
///   `evict_terminal_before` (opt-in TTL).
pub struct StatusLedger {
    records: DashMap<TaskId, TaskRecord>,
    clock: Arc<dyn Clock>,
}

impl StatusLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: DashMap::new(),
            clock,
        }
    }

    /// Create the `Queued` entry for a new submission.
    pub fn register(&self, task_id: TaskId) -> Result<(), LedgerError> {
        match self.records.entry(task_id) {
            Entry::Occupied(_) => Err(LedgerError::Duplicate(task_id)),
            Entry::Vacant(slot) => {
                slot.insert(TaskRecord::new(task_id, self.clock.now()));
                Ok(())
            }
        }
    }

    pub fn mark_in_progress(&self, task_id: TaskId) -> Result<(), LedgerError> {
        let now = self.clock.now();
        self.update(task_id, |record| record.start(now))
    }

    pub fn mark_completed(&self, task_id: TaskId) -> Result<(), LedgerError> {
        let now = self.clock.now();
        self.update(task_id, |record| record.complete(now))
    }

    pub fn mark_failed(&self, task_id: TaskId, error: String) -> Result<(), LedgerError> {
        let now = self.clock.now();
        self.update(task_id, |record| record.fail(error, now))
    }

    fn update(
        &self,
        task_id: TaskId,
        f: impl FnOnce(&mut TaskRecord) -> Result<(), LedgerError>,
    ) -> Result<(), LedgerError> {
        let mut record = self
            .records
            .get_mut(&task_id)
            .ok_or(LedgerError::NotFound(task_id))?;
        f(record.value_mut())
    }

    /// Current status, `Unknown` if the id was never registered.
    pub fn status(&self, task_id: TaskId) -> TaskStatus {
        self.records.get(&task_id).map(|r| r.state).into()
    }

    pub fn record(&self, task_id: TaskId) -> Option<TaskRecord> {
        self.records.get(&task_id).map(|r| r.value().clone())
    }

    /// Undo a registration whose work item never made it into the channel.
    ///
    /// Only a still-`Queued` entry is removed.
    pub fn forget_queued(&self, task_id: TaskId) -> bool {
        self.records
            .remove_if(&task_id, |_, record| record.state == TaskState::Queued)
            .is_some()
    }

    /// Drop terminal entries that finished before `cutoff`. Returns how many.
    pub fn evict_terminal_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut evicted = 0;
        self.records.retain(|_, record| {
            let expired =
                record.state.is_terminal() && record.finished_at.is_some_and(|at| at < cutoff);
            evicted += usize::from(expired);
            !expired
        });
        evicted
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for record in self.records.iter() {
            counts.add(record.state);
        }
        counts
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
