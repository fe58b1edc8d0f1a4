//! JobStore port - named queues with at-least-once delivery.

use async_trait::async_trait;

use crate::domain::{Job, JobId, QueueName};
use crate::error::StoreError;
use crate::observability::QueueCounts;

/// A leased job.
/// The worker owns this lease and must either `ack` or `fail` it.
///
/// - The store manages state transitions (queued -> running -> ...).
/// - The worker executes side effects and reports the result.
#[async_trait]
pub trait JobLease: Send {
    fn job(&self) -> &Job;

    /// Mark success; the job is removed from the queue.
    async fn ack(self: Box<Self>) -> Result<(), StoreError>;

    /// Mark failure; the store decides between retry and dead-letter.
    async fn fail(self: Box<Self>, reason: String) -> Result<(), StoreError>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Enqueue a payload on a named queue.
    async fn enqueue(
        &self,
        queue: &QueueName,
        payload: serde_json::Value,
    ) -> Result<JobId, StoreError>;

    /// Lease one ready job.
    ///
    /// Waits until a job is available or the store's poll interval elapses,
    /// in which case `Ok(None)` is returned.
    async fn lease(&self, queue: &QueueName) -> Result<Option<Box<dyn JobLease>>, StoreError>;

    async fn counts(&self, queue: &QueueName) -> Result<QueueCounts, StoreError>;
}
