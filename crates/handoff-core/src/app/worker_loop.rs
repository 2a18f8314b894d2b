//! WorkerLoop - タスク実行ループ
//!
//! # フロー
//! 1. WorkReceiver::recv() で次の QueuedWork を待つ（shutdown と競合させる）
//! 2. 台帳を InProgress に更新
//! 3. WorkItem を専用の tokio task で実行（panic を閉じ込めるため）
//! 4. 結果で台帳を Completed / Failed に更新して 1 に戻る
//!
//! 単一コンシューマなので実行順は投入順と一致し、同時に走る WorkItem は常に 1 つ。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::TaskId;
use crate::queue::{QueuedWork, StatusLedger, WorkContext, WorkError, WorkReceiver};

/// Single consumer that drains the work channel.
pub struct WorkerLoop {
    receiver: WorkReceiver,
    ledger: Arc<StatusLedger>,
    shutdown: CancellationToken,
    item_timeout: Option<Duration>,
}

impl WorkerLoop {
    pub fn new(
        receiver: WorkReceiver,
        ledger: Arc<StatusLedger>,
        shutdown: CancellationToken,
        item_timeout: Option<Duration>,
    ) -> Self {
        Self {
            receiver,
            ledger,
            shutdown,
            item_timeout,
        }
    }

    /// Run until shutdown is requested while idle, or until every producer
    /// handle is gone.
    pub async fn run(mut self) {
        info!("worker loop starting");

        loop {
            // 空のチャネルで待っている間だけ shutdown を見る。実行中の WorkItem は止めない。
            let work = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                work = self.receiver.recv() => work,
            };

            let Some(work) = work else {
                debug!("all producers dropped");
                break;
            };

            self.execute(work).await;
        }

        let abandoned = self.receiver.close_and_drain();
        if !abandoned.is_empty() {
            warn!(
                count = abandoned.len(),
                "worker stopped with queued tasks left unexecuted"
            );
        }

        info!("worker loop stopping");
    }

    async fn execute(&self, work: QueuedWork) {
        let QueuedWork { task_id, item } = work;
        let kind = item.kind();

        if let Err(e) = self.ledger.mark_in_progress(task_id) {
            warn!(%task_id, error = %e, "unexpected ledger state before execution");
        }
        debug!(%task_id, kind, "task started");

        let cancel = self.shutdown.child_token();
        let ctx = WorkContext::new(task_id, cancel.clone());
        let started = Instant::now();
        let mut handle = tokio::spawn(item.run(ctx));

        let result = match self.item_timeout {
            None => flatten(handle.await),
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => flatten(joined),
                Err(_) => {
                    cancel.cancel();
                    handle.abort();
                    Err(format!("timed out after {limit:?}"))
                }
            },
        };

        self.finish(task_id, kind, started.elapsed(), result);
    }

    fn finish(&self, task_id: TaskId, kind: &str, elapsed: Duration, result: Result<(), String>) {
        let recorded = match result {
            Ok(()) => {
                info!(%task_id, kind, ?elapsed, "task completed");
                self.ledger.mark_completed(task_id)
            }
            Err(message) => {
                error!(%task_id, kind, ?elapsed, error = %message, "task failed");
                self.ledger.mark_failed(task_id, message)
            }
        };

        if let Err(e) = recorded {
            warn!(%task_id, error = %e, "could not record task outcome");
        }
    }
}

fn flatten(joined: Result<Result<(), WorkError>, JoinError>) -> Result<(), String> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) if e.is_panic() => Err("work item panicked".to_string()),
        Err(e) => Err(format!("work item aborted: {e}")),
    }
}
