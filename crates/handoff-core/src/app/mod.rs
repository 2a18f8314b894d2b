//! App - アプリケーション層
//!
//! queue のパーツを組み合わせて、バックグラウンドで動くループを構成します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: 設定の検証とワイヤリング
//! - **Runtime**: 起動済みループのハンドル（shutdown / join）
//! - **WorkerLoop**: タスク実行ループ（recv→InProgress→run→Completed/Failed）
//! - **ReaperLoop**: 終了済みエントリの TTL 回収（任意）
//! - **Status**: 問い合わせ結果のビュー

pub mod builder;
pub mod config;
pub mod reaper_loop;
pub mod runtime;
pub mod status;
pub mod worker_loop;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::config::QueueConfig;
pub use self::reaper_loop::ReaperLoop;
pub use self::runtime::Runtime;
pub use self::status::{StatusCounts, StatusReport};
pub use self::worker_loop::WorkerLoop;
