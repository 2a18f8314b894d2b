use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use handoff_core::ports::FixedClock;
use handoff_core::{AppBuilder, QueueError, TaskId, TaskQueue, TaskStatus, WorkError, work_fn};
use tokio::sync::oneshot;

fn rank(status: TaskStatus) -> u8 {
    match status {
        TaskStatus::Unknown => 0,
        TaskStatus::Queued => 1,
        TaskStatus::InProgress => 2,
        TaskStatus::Completed | TaskStatus::Failed => 3,
    }
}

/// Poll `id` until terminal and return the distinct statuses seen, in order.
async fn observe(queue: &TaskQueue, id: TaskId, every: Duration) -> Vec<TaskStatus> {
    let mut seen: Vec<TaskStatus> = Vec::new();
    loop {
        let status = queue.get_status(id);
        if seen.last() != Some(&status) {
            seen.push(status);
        }
        if status.is_terminal() {
            return seen;
        }
        tokio::time::sleep(every).await;
    }
}

#[tokio::test]
async fn status_is_queued_right_after_submission() {
    let app = AppBuilder::new().capacity(8).build().unwrap();
    let ids: Vec<TaskId> = (0..5).map(|_| TaskId::generate()).collect();

    for id in &ids {
        app.queue
            .submit(work_fn(|_ctx| async { Ok(()) }), *id)
            .await
            .unwrap();
        assert_eq!(app.queue.get_status(*id), TaskStatus::Queued);
    }
}

#[tokio::test]
async fn never_submitted_id_is_unknown() {
    let runtime = AppBuilder::new().build().unwrap().spawn();
    let queue = runtime.queue().clone();

    queue
        .submit(work_fn(|_ctx| async { Ok(()) }), TaskId::generate())
        .await
        .unwrap();

    assert_eq!(queue.get_status(TaskId::generate()), TaskStatus::Unknown);
    runtime.shutdown_and_join().await;
}

#[tokio::test]
async fn execution_starts_in_submission_order() {
    let app = AppBuilder::new().capacity(8).build().unwrap();
    let started: Arc<Mutex<Vec<TaskId>>> = Arc::new(Mutex::new(Vec::new()));
    let ids: Vec<TaskId> = (0..3).map(|_| TaskId::generate()).collect();

    for id in &ids {
        let started = Arc::clone(&started);
        app.queue
            .submit(
                work_fn(move |ctx| async move {
                    started.lock().unwrap().push(ctx.task_id());
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Ok(())
                }),
                *id,
            )
            .await
            .unwrap();
    }

    let runtime = app.spawn();
    let queue = runtime.queue().clone();
    queue
        .poll_until_terminal(ids[2], Duration::from_millis(5))
        .await;

    assert_eq!(*started.lock().unwrap(), ids);
    runtime.shutdown_and_join().await;
}

#[tokio::test]
async fn full_channel_suspends_producer_until_worker_dequeues() {
    let app = AppBuilder::new().capacity(2).build().unwrap();
    let queue = app.queue.clone();
    let (a, b, c) = (TaskId::generate(), TaskId::generate(), TaskId::generate());

    let (release_tx, release_rx) = oneshot::channel::<()>();
    let within = Duration::from_millis(100);

    tokio::time::timeout(
        within,
        queue.submit(
            work_fn(move |_ctx| async move {
                let _ = release_rx.await;
                Ok(())
            }),
            a,
        ),
    )
    .await
    .expect("A should be accepted immediately")
    .unwrap();

    tokio::time::timeout(within, queue.submit(work_fn(|_ctx| async { Ok(()) }), b))
        .await
        .expect("B should be accepted immediately")
        .unwrap();

    let submit_c = tokio::spawn({
        let queue = queue.clone();
        async move { queue.submit(work_fn(|_ctx| async { Ok(()) }), c).await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!submit_c.is_finished(), "C must wait while the channel is full");
    assert_eq!(queue.pending(), 2);

    // Worker takes A off the channel, which frees a slot for C.
    let runtime = app.spawn();
    tokio::time::timeout(Duration::from_secs(1), submit_c)
        .await
        .expect("C should be accepted once A is dequeued")
        .unwrap()
        .unwrap();
    assert_eq!(queue.get_status(a), TaskStatus::InProgress);

    release_tx.send(()).unwrap();
    assert_eq!(
        queue.poll_until_terminal(c, Duration::from_millis(5)).await,
        TaskStatus::Completed
    );
    assert_eq!(queue.get_status(b), TaskStatus::Completed);
    runtime.shutdown_and_join().await;
}

#[tokio::test(start_paused = true)]
async fn successful_task_walks_queued_in_progress_completed() {
    let app = AppBuilder::new().capacity(1).build().unwrap();
    let queue = app.queue.clone();
    let x = TaskId::generate();

    queue
        .submit(
            work_fn(|_ctx| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            }),
            x,
        )
        .await
        .unwrap();
    assert_eq!(queue.get_status(x), TaskStatus::Queued);

    let runtime = app.spawn();
    let seen = observe(&queue, x, Duration::from_millis(10)).await;

    assert_eq!(
        seen,
        vec![
            TaskStatus::Queued,
            TaskStatus::InProgress,
            TaskStatus::Completed
        ]
    );
    runtime.shutdown_and_join().await;
}

#[tokio::test]
async fn failing_task_does_not_block_the_next_one() {
    let runtime = AppBuilder::new().capacity(4).build().unwrap().spawn();
    let queue = runtime.queue().clone();
    let (y, z) = (TaskId::generate(), TaskId::generate());

    queue
        .submit(
            work_fn(|_ctx| async { Err(WorkError::msg("publish endpoint returned 500")) }),
            y,
        )
        .await
        .unwrap();
    assert_eq!(
        queue.poll_until_terminal(y, Duration::from_millis(5)).await,
        TaskStatus::Failed
    );

    queue
        .submit(work_fn(|_ctx| async { Ok(()) }), z)
        .await
        .unwrap();
    assert_eq!(
        queue.poll_until_terminal(z, Duration::from_millis(5)).await,
        TaskStatus::Completed
    );

    let counts = queue.counts();
    assert_eq!(counts.failed, 1);
    assert_eq!(counts.completed, 1);
    runtime.shutdown_and_join().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_producers_lose_nothing_and_statuses_only_move_forward() {
    let runtime = AppBuilder::new().capacity(4).build().unwrap().spawn();
    let queue = runtime.queue().clone();
    let ids: Vec<TaskId> = (0..40).map(|_| TaskId::generate()).collect();

    let producers: Vec<_> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let queue = queue.clone();
            let id = *id;
            tokio::spawn(async move {
                queue
                    .submit(
                        work_fn(move |_ctx| async move {
                            tokio::time::sleep(Duration::from_millis(1)).await;
                            if i % 3 == 0 {
                                Err(WorkError::msg("flaky assistant"))
                            } else {
                                Ok(())
                            }
                        }),
                        id,
                    )
                    .await
            })
        })
        .collect();

    let watchers: Vec<_> = ids
        .iter()
        .map(|id| {
            let queue = queue.clone();
            let id = *id;
            tokio::spawn(async move {
                let mut last = 0u8;
                loop {
                    let status = queue.get_status(id);
                    let r = rank(status);
                    assert!(r >= last, "{id} moved backwards to {status}");
                    last = r;
                    if status.is_terminal() {
                        return status;
                    }
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            })
        })
        .collect();

    for p in producers {
        p.await.unwrap().unwrap();
    }
    let mut failed = 0;
    for w in watchers {
        if w.await.unwrap() == TaskStatus::Failed {
            failed += 1;
        }
    }

    assert_eq!(failed, ids.iter().enumerate().filter(|(i, _)| i % 3 == 0).count());
    assert_eq!(queue.counts().total(), ids.len());
    runtime.shutdown_and_join().await;
}

#[tokio::test]
async fn submit_after_shutdown_reports_closed() {
    let runtime = AppBuilder::new().build().unwrap().spawn();
    let queue = runtime.queue().clone();
    runtime.shutdown_and_join().await;

    let id = TaskId::generate();
    let err = queue
        .submit(work_fn(|_ctx| async { Ok(()) }), id)
        .await
        .unwrap_err();
    assert!(matches!(err, QueueError::Closed));
    assert_eq!(queue.get_status(id), TaskStatus::Unknown);
}

#[tokio::test(start_paused = true)]
async fn finished_entries_are_kept_without_ttl() {
    let runtime = AppBuilder::new().build().unwrap().spawn();
    let queue = runtime.queue().clone();
    let id = TaskId::generate();

    queue
        .submit(work_fn(|_ctx| async { Ok(()) }), id)
        .await
        .unwrap();
    queue.poll_until_terminal(id, Duration::from_millis(5)).await;

    tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
    assert_eq!(queue.get_status(id), TaskStatus::Completed);
    runtime.shutdown_and_join().await;
}

#[tokio::test(start_paused = true)]
async fn finished_entries_expire_when_ttl_is_configured() {
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
    ));
    let runtime = AppBuilder::new()
        .status_ttl(Duration::from_secs(60))
        .reap_interval(Duration::from_secs(10))
        .clock(clock.clone())
        .build()
        .unwrap()
        .spawn();
    let queue = runtime.queue().clone();
    let (done, waiting) = (TaskId::generate(), TaskId::generate());
    let (release_tx, release_rx) = oneshot::channel::<()>();

    queue
        .submit(work_fn(|_ctx| async { Ok(()) }), done)
        .await
        .unwrap();
    queue
        .submit(
            work_fn(move |_ctx| async move {
                let _ = release_rx.await;
                Ok(())
            }),
            waiting,
        )
        .await
        .unwrap();
    queue.poll_until_terminal(done, Duration::from_millis(5)).await;

    clock.advance(chrono::Duration::minutes(2));
    tokio::time::sleep(Duration::from_secs(11)).await;

    assert_eq!(queue.get_status(done), TaskStatus::Unknown);
    assert_eq!(queue.get_status(waiting), TaskStatus::InProgress);

    release_tx.send(()).unwrap();
    queue.poll_until_terminal(waiting, Duration::from_millis(5)).await;
    runtime.shutdown_and_join().await;
}
