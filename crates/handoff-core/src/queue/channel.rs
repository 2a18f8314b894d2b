//! Bounded work channel between producers and the worker.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::work::WorkItem;
use crate::domain::TaskId;
use crate::error::QueueError;

/// A work item on its way to the worker, tagged with its task id.
pub struct QueuedWork {
    pub task_id: TaskId,
    pub item: Box<dyn WorkItem>,
}

impl QueuedWork {
    pub fn new(task_id: TaskId, item: Box<dyn WorkItem>) -> Self {
        Self { task_id, item }
    }
}

/// Create a FIFO channel holding at most `capacity` pending items.
///
/// `capacity` must be non-zero; the builder checks this before we get here.
pub fn work_channel(capacity: usize) -> (WorkSender, WorkReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (WorkSender { tx }, WorkReceiver { rx })
}

/// Producer half. Cheap to clone; every clone feeds the same buffer.
#[derive(Clone)]
pub struct WorkSender {
    tx: mpsc::Sender<QueuedWork>,
}

impl WorkSender {
    /// Send, waiting for a free slot when the buffer is full.
    pub async fn send(&self, work: QueuedWork) -> Result<(), QueueError> {
        self.tx.send(work).await.map_err(|_| QueueError::Closed)
    }

    /// Send without waiting.
    pub fn try_send(&self, work: QueuedWork) -> Result<(), QueueError> {
        self.tx.try_send(work).map_err(|e| match e {
            TrySendError::Full(_) => QueueError::Full {
                capacity: self.tx.max_capacity(),
            },
            TrySendError::Closed(_) => QueueError::Closed,
        })
    }

    pub fn max_capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Items currently buffered (sent but not yet received).
    pub fn pending(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half, owned by the worker loop.
pub struct WorkReceiver {
    rx: mpsc::Receiver<QueuedWork>,
}

impl WorkReceiver {
    /// Wait for the next item. `None` once closed and drained, or once every
    /// sender has been dropped.
    pub async fn recv(&mut self) -> Option<QueuedWork> {
        self.rx.recv().await
    }

    /// Refuse new sends (blocked senders get `Closed`) and hand back whatever
    /// was still buffered.
    pub fn close_and_drain(&mut self) -> Vec<QueuedWork> {
        self.rx.close();
        let mut left = Vec::new();
        while let Ok(work) = self.rx.try_recv() {
            left.push(work);
        }
        left
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::work::work_fn;
    use std::time::Duration;

    fn noop(task_id: TaskId) -> QueuedWork {
        QueuedWork::new(task_id, Box::new(work_fn(|_ctx| async { Ok(()) })))
    }

    #[tokio::test]
    async fn items_come_out_in_send_order() {
        let (tx, mut rx) = work_channel(8);
        let ids: Vec<TaskId> = (0..5).map(|_| TaskId::generate()).collect();
        for id in &ids {
            tx.send(noop(*id)).await.unwrap();
        }
        assert_eq!(tx.pending(), 5);

        for id in &ids {
            assert_eq!(rx.recv().await.unwrap().task_id, *id);
        }
        assert_eq!(tx.pending(), 0);
    }

    #[tokio::test]
    async fn try_send_reports_full() {
        let (tx, _rx) = work_channel(1);
        tx.try_send(noop(TaskId::generate())).unwrap();

        let err = tx.try_send(noop(TaskId::generate())).unwrap_err();
        assert!(matches!(err, QueueError::Full { capacity: 1 }));
    }

    #[tokio::test]
    async fn send_waits_for_a_free_slot() {
        let (tx, mut rx) = work_channel(1);
        tx.send(noop(TaskId::generate())).await.unwrap();

        let blocked = tokio::spawn({
            let tx = tx.clone();
            async move { tx.send(noop(TaskId::generate())).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!blocked.is_finished());

        rx.recv().await.unwrap();
        blocked.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn close_wakes_blocked_sender_and_returns_leftovers() {
        let (tx, mut rx) = work_channel(1);
        let first = TaskId::generate();
        tx.send(noop(first)).await.unwrap();

        let blocked = tokio::spawn({
            let tx = tx.clone();
            async move { tx.send(noop(TaskId::generate())).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let left = rx.close_and_drain();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].task_id, first);

        assert!(matches!(blocked.await.unwrap(), Err(QueueError::Closed)));
        assert!(tx.is_closed());
        assert!(matches!(
            tx.send(noop(TaskId::generate())).await,
            Err(QueueError::Closed)
        ));
    }
}
