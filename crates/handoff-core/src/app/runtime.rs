//! Runtime - 起動済みキューのハンドル
//!
//! - `request_shutdown()` で新規受付を止め、アイドル中のワーカーを終了させる
//! - `shutdown_and_join()` でバックグラウンドループ全体の終了を待てる

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::queue::TaskQueue;

/// Running queue: the producer handle plus the spawned background loops.
pub struct Runtime {
    queue: TaskQueue,
    shutdown: CancellationToken,
    joins: Vec<JoinHandle<()>>,
}

impl Runtime {
    pub(crate) fn new(
        queue: TaskQueue,
        shutdown: CancellationToken,
        joins: Vec<JoinHandle<()>>,
    ) -> Self {
        Self {
            queue,
            shutdown,
            joins,
        }
    }

    /// Handle to clone into request handlers.
    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    /// Token that fires when shutdown is requested.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Request shutdown.
    /// This does not forcibly cancel in-flight work; the running item sees
    /// its token fire and is expected to return on its own.
    pub fn request_shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Shutdown and wait for every background loop to exit.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for join in self.joins {
            if let Err(e) = join.await {
                warn!(error = %e, "background loop ended abnormally");
            }
        }
    }
}
