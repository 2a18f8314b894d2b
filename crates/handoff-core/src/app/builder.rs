//! AppBuilder - キューの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - グローバル状態を使わず、構築したハンドルを明示的に配る

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::config::QueueConfig;
use super::reaper_loop::ReaperLoop;
use super::runtime::Runtime;
use super::worker_loop::WorkerLoop;
use crate::ports::{Clock, SystemClock};
use crate::queue::{StatusLedger, TaskQueue, work_channel};

/// AppBuilder はキュー一式を構築
///
/// # 使用例
/// ```ignore
/// let runtime = AppBuilder::new()
///     .capacity(100)
///     .build()?
///     .spawn();
///
/// let queue = runtime.queue().clone(); // リクエストハンドラへ配る
/// ```
///
/// # Fail-fast 設計
/// - build() 時に設定値を検証し、不正なら BuildError を返す
pub struct AppBuilder {
    config: QueueConfig,
    clock: Arc<dyn Clock>,
}

/// BuildError はキュー構築時のエラー
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("capacity must be at least 1")]
    ZeroCapacity,

    #[error("item timeout must be greater than zero")]
    ZeroItemTimeout,

    #[error("status TTL must be greater than zero")]
    ZeroStatusTtl,

    #[error("reap interval must be greater than zero")]
    ZeroReapInterval,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            config: QueueConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// 設定をまとめて差し替える
    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    pub fn item_timeout(mut self, timeout: Duration) -> Self {
        self.config.item_timeout = Some(timeout);
        self
    }

    pub fn status_ttl(mut self, ttl: Duration) -> Self {
        self.config.status_ttl = Some(ttl);
        self
    }

    pub fn reap_interval(mut self, interval: Duration) -> Self {
        self.config.reap_interval = interval;
        self
    }

    /// 台帳のタイムスタンプに使う Clock（テストでは FixedClock）
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn validate(&self) -> Result<(), BuildError> {
        let c = &self.config;
        if c.capacity == 0 {
            return Err(BuildError::ZeroCapacity);
        }
        if c.item_timeout.is_some_and(|t| t.is_zero()) {
            return Err(BuildError::ZeroItemTimeout);
        }
        if let Some(ttl) = c.status_ttl {
            if ttl.is_zero() {
                return Err(BuildError::ZeroStatusTtl);
            }
            if c.reap_interval.is_zero() {
                return Err(BuildError::ZeroReapInterval);
            }
        }
        Ok(())
    }

    /// 検証してから App を生成
    ///
    /// まだ何も spawn しないので、ワーカー起動前に submit しておくこともできます。
    pub fn build(self) -> Result<App, BuildError> {
        self.validate()?;

        let shutdown = CancellationToken::new();
        let ledger = Arc::new(StatusLedger::new(self.clock));
        let (tx, rx) = work_channel(self.config.capacity);

        let queue = TaskQueue::new(Arc::clone(&ledger), tx, shutdown.clone());
        let worker = WorkerLoop::new(
            rx,
            Arc::clone(&ledger),
            shutdown.clone(),
            self.config.item_timeout,
        );
        let reaper = self.config.status_ttl.map(|ttl| {
            ReaperLoop::new(
                Arc::clone(&ledger),
                ttl,
                self.config.reap_interval,
                shutdown.clone(),
            )
        });

        Ok(App {
            queue,
            worker,
            reaper,
            shutdown,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 構築済みだが未起動のキュー一式
pub struct App {
    pub queue: TaskQueue,
    pub worker: WorkerLoop,
    pub reaper: Option<ReaperLoop>,
    shutdown: CancellationToken,
}

impl App {
    /// 現在の tokio runtime 上でワーカー（と有効ならリーパー）を起動
    pub fn spawn(self) -> Runtime {
        let mut joins = vec![tokio::spawn(self.worker.run())];
        if let Some(reaper) = self.reaper {
            joins.push(tokio::spawn(reaper.run()));
        }
        Runtime::new(self.queue, self.shutdown, joins)
    }
}
