//! handoff-core
//!
//! リクエストハンドラから長時間処理をバックグラウンドへ引き渡し、
//! 後から状態をポーリングするためのインプロセス・タスクキュー。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（TaskId, TaskState / TaskStatus, TaskRecord）
//! - **ports**: 抽象化レイヤー（Clock, IdGenerator）
//! - **queue**: TaskQueue ハンドル、StatusLedger、境界付き WorkChannel、WorkItem
//! - **app**: WorkerLoop / ReaperLoop、AppBuilder、Runtime、ステータスビュー
//! - **error**: QueueError / LedgerError
//!
//! # 制約
//! ワーカーは 1 本だけなので、戻ってこない WorkItem はその後ろの全タスクを止めます。
//! 必要なら `QueueConfig::item_timeout` で上限を設けてください。

pub mod app;
pub mod domain;
pub mod error;
pub mod ports;
pub mod queue;

pub use app::{AppBuilder, QueueConfig, Runtime, StatusCounts, StatusReport};
pub use domain::{TaskId, TaskRecord, TaskState, TaskStatus};
pub use error::{LedgerError, QueueError};
pub use queue::{
    DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL, TaskQueue, WorkContext, WorkError, WorkItem, work_fn,
};
