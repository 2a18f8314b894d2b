//! ReaperLoop - 終了済みタスクの台帳エントリ回収
//!
//! 既定では起動しません（台帳はプロセス終了まで全エントリを保持）。
//! `QueueConfig::status_ttl` を設定したときだけ `AppBuilder` が組み込みます。
//!
//! # フロー
//! 1. `interval` ごとに起床
//! 2. `now - ttl` より前に終了した Completed / Failed を削除
//! 3. shutdown で終了

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::queue::StatusLedger;

/// Periodically evicts terminal ledger entries older than `ttl`.
pub struct ReaperLoop {
    ledger: Arc<StatusLedger>,
    ttl: Duration,
    interval: Duration,
    shutdown: CancellationToken,
}

impl ReaperLoop {
    pub fn new(
        ledger: Arc<StatusLedger>,
        ttl: Duration,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            ledger,
            ttl,
            interval,
            shutdown,
        }
    }

    pub async fn run(self) {
        info!(ttl = ?self.ttl, interval = ?self.interval, "reaper loop starting");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval の初回 tick は即時なので読み捨てる
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let evicted = self.reap_once();
                    if evicted > 0 {
                        debug!(evicted, remaining = self.ledger.len(), "evicted finished tasks");
                    }
                }
            }
        }

        info!("reaper loop stopping");
    }

    /// One eviction pass. Returns the number of entries removed.
    pub fn reap_once(&self) -> usize {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        let cutoff = self
            .ledger
            .now()
            .checked_sub_signed(ttl)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC);
        self.ledger.evict_terminal_before(cutoff)
    }
}
