//! handoff - デモ用 CLI
//!
//! 引数の SEO フレーズごとに「リクエスト」を 1 件ずつ投げ、
//! 受付レスポンス（task_id）を返したあとはクライアント側でステータスをポーリングします。
//!
//! ```text
//! RUST_LOG=handoff_core=debug handoff --capacity 2 --fail-phrase "broken" "rust async" "broken"
//! ```

mod workflow;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use handoff_core::app::config::DEFAULT_CAPACITY;
use handoff_core::ports::{IdGenerator, SystemClock, UlidGenerator};
use handoff_core::{
    AppBuilder, MIN_POLL_INTERVAL, QueueError, StatusReport, TaskId, TaskQueue, TaskStatus,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::workflow::{Accepted, ArticleRequest, ArticleWorkflow, RequestError, Stage};

#[derive(Debug, Parser)]
#[command(name = "handoff", about = "Hand article generation off to a background queue")]
struct Args {
    /// Work channel capacity; producers wait when it is full
    #[arg(long, env = "HANDOFF_CAPACITY", default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Fail any single item that runs longer than this
    #[arg(long, env = "HANDOFF_ITEM_TIMEOUT_MS")]
    item_timeout_ms: Option<u64>,

    /// Forget finished tasks after this many seconds
    #[arg(long, env = "HANDOFF_STATUS_TTL_SECS")]
    status_ttl_secs: Option<u64>,

    /// How often each client asks for its task status
    #[arg(long, default_value_t = 5000, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval_ms: u64,

    /// Simulated latency of each external call
    #[arg(long, default_value_t = 250)]
    step_ms: u64,

    /// Phrases whose publish step should fail
    #[arg(long = "fail-phrase")]
    fail_phrases: Vec<String>,

    /// SEO phrases to generate articles for
    #[arg(default_values_t = ["rust async".to_string(), "bounded channels".to_string()])]
    phrases: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
enum HandlerError {
    #[error(transparent)]
    BadRequest(#[from] RequestError),

    #[error(transparent)]
    Unavailable(#[from] QueueError),
}

/// Request handler: validate, pick an id, hand the workflow off, answer at once.
async fn handle_generate(
    queue: &TaskQueue,
    ids: &dyn IdGenerator,
    seo_phrase: &str,
    fail_phrases: &[String],
    step_latency: Duration,
) -> Result<Accepted, HandlerError> {
    let request = ArticleRequest::new(seo_phrase)?;
    let mut workflow = ArticleWorkflow::new(request, step_latency);
    if fail_phrases.iter().any(|p| p.trim() == seo_phrase.trim()) {
        workflow = workflow.failing_at(Stage::Publish);
    }

    let task_id = ids.generate_task_id();
    queue.submit(workflow, task_id).await?;
    Ok(Accepted { task_id })
}

/// Client side: poll until the status stops changing for good.
async fn follow(queue: TaskQueue, task_id: TaskId, every: Duration) -> TaskStatus {
    let mut ticker = tokio::time::interval(every.max(MIN_POLL_INTERVAL));
    let mut last = None;
    loop {
        ticker.tick().await;
        let status = queue.get_status(task_id);
        if last != Some(status) {
            print_json(&StatusReport::new(task_id, status));
            last = Some(status);
        }
        if status.is_terminal() || status == TaskStatus::Unknown {
            return status;
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!(error = %e, "failed to encode response"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let mut builder = AppBuilder::new().capacity(args.capacity);
    if let Some(ms) = args.item_timeout_ms {
        builder = builder.item_timeout(Duration::from_millis(ms));
    }
    if let Some(secs) = args.status_ttl_secs {
        builder = builder.status_ttl(Duration::from_secs(secs));
    }
    let runtime = builder.build()?.spawn();
    let queue = runtime.queue().clone();

    let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(SystemClock));
    let fail_phrases = Arc::new(args.fail_phrases);
    let step_latency = Duration::from_millis(args.step_ms);
    let poll_every = Duration::from_millis(args.poll_interval_ms);

    let clients: Vec<_> = args
        .phrases
        .into_iter()
        .map(|phrase| {
            let queue = queue.clone();
            let ids = Arc::clone(&ids);
            let fail_phrases = Arc::clone(&fail_phrases);
            tokio::spawn(async move {
                match handle_generate(&queue, ids.as_ref(), &phrase, &fail_phrases, step_latency)
                    .await
                {
                    Ok(accepted) => {
                        print_json(&accepted);
                        Some(follow(queue, accepted.task_id, poll_every).await)
                    }
                    Err(e) => {
                        warn!(%phrase, error = %e, "request rejected");
                        None
                    }
                }
            })
        })
        .collect();

    let all_clients = async {
        let mut finished = Vec::new();
        for client in clients {
            match client.await {
                Ok(status) => finished.extend(status),
                Err(e) => warn!(error = %e, "client task ended abnormally"),
            }
        }
        finished
    };

    tokio::select! {
        finished = all_clients => {
            let failed = finished.iter().filter(|s| **s == TaskStatus::Failed).count();
            info!(finished = finished.len(), failed, "all requests settled");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted; shutting down");
        }
    }

    print_json(&queue.counts());
    runtime.shutdown_and_join().await;
    Ok(())
}
