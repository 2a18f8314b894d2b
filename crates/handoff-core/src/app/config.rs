//! Queue configuration.

use std::time::Duration;

/// Default number of pending items the work channel can hold.
pub const DEFAULT_CAPACITY: usize = 100;

/// Default period of the reaper loop when a status TTL is set.
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(60);

/// Tunables for a task queue.
///
/// Only `capacity` is part of the basic contract. The rest are opt-in and
/// default to off:
/// - `item_timeout`: fail a work item that runs longer than this. Without it,
///   an item that never returns stalls every item behind it.
/// - `status_ttl`: forget Completed/Failed entries this long after they
///   finished. Without it the ledger keeps every entry until process exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    pub capacity: usize,
    pub item_timeout: Option<Duration>,
    pub status_ttl: Option<Duration>,
    pub reap_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            item_timeout: None,
            status_ttl: None,
            reap_interval: DEFAULT_REAP_INTERVAL,
        }
    }
}

impl QueueConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }
}
