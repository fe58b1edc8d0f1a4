use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::QueueName;
use crate::ports::JobStore;
use crate::typed::TypedRegistry;

use super::worker_loop::run_queue;

/// Handle over the running per-queue workers.
///
/// - one task per queue: jobs of a queue run one at a time, queues run
///   concurrently
/// - `request_shutdown` stops taking new leases; in-flight jobs finish
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<(QueueName, JoinHandle<()>)>,
}

impl WorkerGroup {
    pub(crate) fn spawn(
        store: Arc<dyn JobStore>,
        registry: &TypedRegistry,
        error_backoff: Duration,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        if registry.is_empty() {
            tracing::warn!("no executors registered; no queue will be drained");
        }

        let joins = registry
            .iter()
            .map(|(queue, handler)| {
                let queue = QueueName::new(queue);
                let join = tokio::spawn(run_queue(
                    Arc::clone(&store),
                    Arc::clone(handler),
                    queue.clone(),
                    error_backoff,
                    shutdown_rx.clone(),
                ));
                (queue, join)
            })
            .collect();

        Self { shutdown_tx, joins }
    }

    pub fn queues(&self) -> impl Iterator<Item = &QueueName> {
        self.joins.iter().map(|(queue, _)| queue)
    }

    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for every worker.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for (queue, join) in self.joins {
            if let Err(e) = join.await {
                tracing::error!(queue = %queue, error = %e, "worker task panicked");
            }
        }
    }
}
