//! filejobs-worker
//!
//! 環境変数から設定を読み、Redis の job store と具象サービスを組み立てて
//! `file-queue` / `userQueue` のワーカーを Ctrl-C まで動かす。

use std::error::Error;
use std::sync::Arc;

use filejobs_core::domain::{QueueName, ThumbnailJobPayload, WelcomeJobPayload};
use filejobs_core::executors::{ThumbnailExecutor, WelcomeExecutor};
use filejobs_core::impls::{ImageThumbnailer, InMemoryRecords, LocalStorage, LogNotifier};
use filejobs_core::observability::init_tracing;
use filejobs_core::ports::RecordLookup;
use filejobs_core::queue::{RedisJobStore, RetryPolicy};
use filejobs_core::{AppBuilder, WorkerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let config = WorkerConfig::from_env()?;

    let store = RedisJobStore::connect(&config.redis, RetryPolicy::default_policy())
        .await?
        .with_max_attempts(config.max_attempts)
        .with_poll_interval(config.poll_interval)
        .with_lease_timeout(config.lease_timeout);

    let records: Arc<dyn RecordLookup> = match &config.records_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading record snapshot");
            Arc::new(InMemoryRecords::load(path).await?)
        }
        None => {
            tracing::warn!("FILEJOBS_RECORDS not set; every lookup will report not found");
            Arc::new(InMemoryRecords::new())
        }
    };

    let thumbnails = ThumbnailExecutor::new(
        Arc::clone(&records),
        Arc::new(ImageThumbnailer::new()),
        Arc::new(LocalStorage),
    );
    let welcome = WelcomeExecutor::new(records, Arc::new(LogNotifier), config.sender.clone());

    let app = AppBuilder::new(Arc::new(store))
        .register::<ThumbnailJobPayload, _>(thumbnails)?
        .register::<WelcomeJobPayload, _>(welcome)?
        .expect_queues(&[QueueName::FILES, QueueName::USERS])
        .with_error_backoff(config.poll_interval)
        .build()?;

    let workers = app.run();
    tracing::info!(
        queues = ?workers.queues().map(QueueName::as_str).collect::<Vec<_>>(),
        max_attempts = config.max_attempts,
        "workers running"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested; waiting for in-flight jobs");
    workers.shutdown_and_join().await;
    Ok(())
}
