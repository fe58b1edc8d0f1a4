//! WorkerLoop - 1 キュー分の直列実行ループ
//!
//! # フロー
//! 1. `JobStore::lease()` でジョブを 1 件取得（poll interval まで待つ）
//! 2. `DynHandler` で payload を decode して executor を実行 → Outcome
//! 3. Success なら `ack`、Failure / decode エラーなら `fail(reason)`
//!
//! lease 中のジョブは必ず ack か fail のどちらかで store に返す。
//! executor の panic も Failure として扱い、ループは止めない。

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;

use crate::domain::{Outcome, QueueName};
use crate::error::StoreError;
use crate::ports::{JobLease, JobStore};
use crate::typed::DynHandler;

/// Lease and settle at most one job from `queue`.
///
/// Returns `Ok(None)` when nothing became ready within the store's poll
/// interval.
pub async fn process_one(
    store: &dyn JobStore,
    handler: &dyn DynHandler,
    queue: &QueueName,
) -> Result<Option<Outcome>, StoreError> {
    let Some(lease) = store.lease(queue).await? else {
        return Ok(None);
    };
    settle(lease, handler).await.map(Some)
}

async fn settle(lease: Box<dyn JobLease>, handler: &dyn DynHandler) -> Result<Outcome, StoreError> {
    let job = lease.job();
    let job_id = job.id();
    let queue = job.queue().clone();
    let attempt = job.attempts + 1;
    let payload = job.payload().clone();

    tracing::debug!(queue = %queue, job_id = %job_id, attempt, "job started");

    let outcome = match AssertUnwindSafe(handler.handle_dyn(payload))
        .catch_unwind()
        .await
    {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => Outcome::failure(err.to_string()),
        Err(panic) => {
            let message = panic_message(&*panic);
            tracing::error!(queue = %queue, job_id = %job_id, attempt, panic = %message, "executor panicked");
            Outcome::failure(format!("executor panicked: {message}"))
        }
    };

    if outcome.is_success() {
        lease.ack().await?;
        tracing::info!(queue = %queue, job_id = %job_id, attempt, "job succeeded");
    } else {
        let reason = outcome.reason().unwrap_or("failed without reason");
        tracing::warn!(queue = %queue, job_id = %job_id, attempt, reason, "job failed");
        lease.fail(reason.to_string()).await?;
    }
    Ok(outcome)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run `queue` until shutdown is signalled.
///
/// Shutdown is observed between jobs: an in-flight job always finishes and is
/// settled. `lease` returns within the store's poll interval, which bounds
/// how long a stop request can wait.
pub(crate) async fn run_queue(
    store: Arc<dyn JobStore>,
    handler: Arc<dyn DynHandler>,
    queue: QueueName,
    error_backoff: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    tracing::info!(queue = %queue, "worker started");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }
        let step = AssertUnwindSafe(process_one(store.as_ref(), handler.as_ref(), &queue))
            .catch_unwind()
            .await;
        let failure = match step {
            Ok(Ok(_)) => continue,
            Ok(Err(err)) => err.to_string(),
            Err(panic) => format!("panicked: {}", panic_message(&*panic)),
        };
        tracing::error!(queue = %queue, error = %failure, "job store error");
        tokio::select! {
            _ = shutdown_rx.changed() => {}
            _ = tokio::time::sleep(error_backoff) => {}
        }
    }

    tracing::info!(queue = %queue, "worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{InMemoryJobStore, JobState, RetryPolicy};
    use crate::error::JobError;
    use crate::typed::handler::test_support::{PingHandler, PingTask};
    use crate::typed::{Handler, TypedHandler};
    use async_trait::async_trait;
    use serde_json::json;

    /// Panics on zero, succeeds otherwise.
    struct Boom;

    #[async_trait]
    impl Handler<PingTask> for Boom {
        async fn handle(&self, task: PingTask) -> Result<Outcome, JobError> {
            if task.value == 0 {
                panic!("boom on {}", task.value);
            }
            Ok(Outcome::success())
        }
    }

    fn queue() -> QueueName {
        QueueName::new(<PingTask as crate::typed::Task>::QUEUE)
    }

    fn store(max_attempts: u32) -> InMemoryJobStore {
        InMemoryJobStore::new(RetryPolicy::immediate())
            .with_max_attempts(max_attempts)
            .with_poll_interval(Duration::from_millis(20))
    }

    fn handler() -> TypedHandler<PingTask, PingHandler> {
        TypedHandler::new(PingHandler)
    }

    #[tokio::test]
    async fn success_is_acked() {
        let store = store(3);
        let id = store.enqueue(&queue(), json!({ "value": 1 })).await.unwrap();

        let outcome = process_one(&store, &handler(), &queue()).await.unwrap().unwrap();

        assert!(outcome.is_success());
        assert_eq!(store.get(id).await.unwrap().state, JobState::Succeeded);
    }

    #[tokio::test]
    async fn failure_outcome_is_failed_with_reason() {
        let store = store(3);
        let id = store.enqueue(&queue(), json!({ "value": -4 })).await.unwrap();

        let outcome = process_one(&store, &handler(), &queue()).await.unwrap().unwrap();
        assert_eq!(outcome.reason(), Some("negative value -4"));

        let record = store.get(id).await.unwrap();
        assert_eq!(record.state, JobState::Queued);
        assert_eq!(record.job.attempts, 1);
        assert_eq!(record.job.last_error.as_deref(), Some("negative value -4"));
    }

    #[tokio::test]
    async fn undecodable_payload_is_failed_not_dropped() {
        let store = store(1);
        let id = store.enqueue(&queue(), json!({ "value": "x" })).await.unwrap();

        let outcome = process_one(&store, &handler(), &queue()).await.unwrap().unwrap();
        assert!(outcome.reason().unwrap().starts_with("payload decode"));
        assert_eq!(store.get(id).await.unwrap().state, JobState::Dead);
        assert_eq!(store.dead_letters(&queue()).await.len(), 1);
    }

    #[tokio::test]
    async fn empty_queue_yields_nothing() {
        let store = store(3);
        let outcome = process_one(&store, &handler(), &queue()).await.unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn executor_panic_becomes_a_failure() {
        let store = store(1);
        let id = store.enqueue(&queue(), json!({ "value": 0 })).await.unwrap();

        let boom = TypedHandler::<PingTask, _>::new(Boom);
        let outcome = process_one(&store, &boom, &queue()).await.unwrap().unwrap();

        assert_eq!(outcome.reason(), Some("executor panicked: boom on 0"));
        let record = store.get(id).await.unwrap();
        assert_eq!(record.state, JobState::Dead);
        assert_eq!(record.job.last_error.as_deref(), Some("executor panicked: boom on 0"));
    }

    #[tokio::test]
    async fn loop_keeps_draining_after_executor_panic() {
        let store = Arc::new(store(1));
        let crashed = store.enqueue(&queue(), json!({ "value": 0 })).await.unwrap();
        let next = store.enqueue(&queue(), json!({ "value": 1 })).await.unwrap();

        let (tx, rx) = watch::channel(false);
        let join = tokio::spawn(run_queue(
            store.clone(),
            Arc::new(TypedHandler::<PingTask, _>::new(Boom)),
            queue(),
            Duration::from_millis(10),
            rx,
        ));

        for _ in 0..100 {
            if store.get(next).await.unwrap().state == JobState::Succeeded {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(store.get(crashed).await.unwrap().state, JobState::Dead);
        assert_eq!(store.get(next).await.unwrap().state, JobState::Succeeded);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), join)
            .await
            .expect("worker did not stop")
            .expect("worker task panicked");
    }

    #[tokio::test]
    async fn loop_drains_queue_and_stops_on_shutdown() {
        let store = Arc::new(store(3));
        for value in 0..3 {
            store.enqueue(&queue(), json!({ "value": value })).await.unwrap();
        }

        let (tx, rx) = watch::channel(false);
        let join = tokio::spawn(run_queue(
            store.clone(),
            Arc::new(handler()),
            queue(),
            Duration::from_millis(10),
            rx,
        ));

        for _ in 0..100 {
            if store.counts(&queue()).await.unwrap().succeeded == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(store.counts(&queue()).await.unwrap().succeeded, 3);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), join)
            .await
            .expect("worker did not stop")
            .unwrap();
    }
}
