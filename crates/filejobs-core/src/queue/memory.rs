//! In-memory job store.

use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use super::{Decision, JobRecord, JobState, RetryPolicy};
use crate::domain::{Job, JobId, QueueName};
use crate::error::StoreError;
use crate::observability::QueueCounts;
use crate::ports::{JobLease, JobStore};

/// Scheduled retry entry.
///
/// Reverse ordering so BinaryHeap acts as a min-heap (earliest first).
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScheduledJob {
    next_run_at: Instant,
    job_id: JobId,
}

impl PartialOrd for ScheduledJob {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledJob {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.next_run_at.cmp(&self.next_run_at)
    }
}

/// Per-queue structures. They hold JobIds only; records live in the state.
#[derive(Default)]
struct Lane {
    ready: VecDeque<JobId>,
    scheduled: BinaryHeap<ScheduledJob>,
    dead: Vec<JobId>,
    notify: Arc<Notify>,
}

#[derive(Default)]
struct InMemoryState {
    records: HashMap<JobId, JobRecord>,
    lanes: HashMap<QueueName, Lane>,
}

impl InMemoryState {
    fn lane(&mut self, queue: &QueueName) -> &mut Lane {
        self.lanes.entry(queue.clone()).or_default()
    }

    /// Move due retries of `queue` back to its ready list.
    fn promote_scheduled(&mut self, queue: &QueueName) {
        let now = Instant::now();
        let InMemoryState { records, lanes } = self;
        let lane = lanes.entry(queue.clone()).or_default();

        while let Some(entry) = lane.scheduled.peek() {
            if entry.next_run_at > now {
                break;
            }
            let job_id = entry.job_id;
            lane.scheduled.pop();
            if let Some(record) = records.get_mut(&job_id) {
                if record.state == JobState::RetryScheduled {
                    record.requeue();
                    lane.ready.push_back(job_id);
                }
            }
        }
    }

    fn counts(&self, queue: &QueueName) -> QueueCounts {
        let mut counts = QueueCounts::default();
        for record in self.records.values().filter(|r| r.job.queue() == queue) {
            match record.state {
                JobState::Queued => counts.queued += 1,
                JobState::Running => counts.running += 1,
                JobState::Succeeded => counts.succeeded += 1,
                JobState::RetryScheduled => counts.retry_scheduled += 1,
                JobState::Dead => counts.dead += 1,
            }
        }
        counts
    }
}

/// In-memory job store.
///
/// Keeps every record (including succeeded and dead ones) for inspection,
/// so memory grows with every job ever enqueued. Meant for tests and
/// short-lived development runs only; a long-running worker uses
/// `RedisJobStore`. Nothing survives a restart.
pub struct InMemoryJobStore {
    state: Arc<Mutex<InMemoryState>>,
    retry_policy: RetryPolicy,
    max_attempts: u32,
    poll_interval: Duration,
}

impl InMemoryJobStore {
    pub fn new(retry_policy: RetryPolicy) -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryState::default())),
            retry_policy,
            max_attempts: 5,
            poll_interval: Duration::from_secs(1),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub async fn get(&self, job_id: JobId) -> Option<JobRecord> {
        let state = self.state.lock().await;
        state.records.get(&job_id).cloned()
    }

    /// Jobs of `queue` that exhausted their attempts, oldest first.
    pub async fn dead_letters(&self, queue: &QueueName) -> Vec<Job> {
        let state = self.state.lock().await;
        state
            .lanes
            .get(queue)
            .map(|lane| {
                lane.dead
                    .iter()
                    .filter_map(|id| state.records.get(id))
                    .map(|r| r.job.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn enqueue(
        &self,
        queue: &QueueName,
        payload: serde_json::Value,
    ) -> Result<JobId, StoreError> {
        let job = Job::new(queue.clone(), payload, self.max_attempts);
        let job_id = job.id();

        let notify = {
            let mut state = self.state.lock().await;
            state.records.insert(job_id, JobRecord::new(job));
            let lane = state.lane(queue);
            lane.ready.push_back(job_id);
            Arc::clone(&lane.notify)
        };
        // lock の外で通知する
        notify.notify_one();

        tracing::debug!(queue = %queue, job_id = %job_id, "job enqueued");
        Ok(job_id)
    }

    async fn lease(&self, queue: &QueueName) -> Result<Option<Box<dyn JobLease>>, StoreError> {
        let deadline = Instant::now() + self.poll_interval;

        loop {
            let (notify, next_wake) = {
                let mut state = self.state.lock().await;
                state.promote_scheduled(queue);

                let InMemoryState { records, lanes } = &mut *state;
                let lane = lanes.entry(queue.clone()).or_default();

                if let Some(job_id) = lane.ready.pop_front() {
                    if let Some(record) = records.get_mut(&job_id) {
                        record.start_attempt();
                        let lease = InMemoryLease {
                            job: record.job.clone(),
                            state: Arc::clone(&self.state),
                            retry_policy: self.retry_policy.clone(),
                        };
                        return Ok(Some(Box::new(lease)));
                    }
                    continue;
                }

                (
                    Arc::clone(&lane.notify),
                    lane.scheduled.peek().map(|entry| entry.next_run_at),
                )
            };

            if Instant::now() >= deadline {
                return Ok(None);
            }

            // 次の retry 予定か poll 期限の早い方まで待つ
            let wake_at = next_wake.map_or(deadline, |at| at.min(deadline));
            tokio::select! {
                _ = notify.notified() => {},
                _ = tokio::time::sleep_until(wake_at.into()) => {},
            }
        }
    }

    async fn counts(&self, queue: &QueueName) -> Result<QueueCounts, StoreError> {
        let state = self.state.lock().await;
        Ok(state.counts(queue))
    }
}

struct InMemoryLease {
    job: Job,
    state: Arc<Mutex<InMemoryState>>,
    retry_policy: RetryPolicy,
}

#[async_trait]
impl JobLease for InMemoryLease {
    fn job(&self) -> &Job {
        &self.job
    }

    async fn ack(self: Box<Self>) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        match state.records.get_mut(&self.job.id()) {
            Some(record) if record.state == JobState::Running => {
                record.mark_succeeded();
                Ok(())
            }
            _ => Err(StoreError::NotLeased(self.job.id().to_string())),
        }
    }

    async fn fail(self: Box<Self>, reason: String) -> Result<(), StoreError> {
        let job_id = self.job.id();
        let queue = self.job.queue().clone();

        let notify = {
            let mut state = self.state.lock().await;
            let InMemoryState { records, lanes } = &mut *state;

            let record = match records.get_mut(&job_id) {
                Some(record) if record.state == JobState::Running => record,
                _ => return Err(StoreError::NotLeased(job_id.to_string())),
            };
            record.record_failure(reason);

            let lane = lanes.entry(queue.clone()).or_default();
            match self.retry_policy.decide(&record.job) {
                Decision::Retry { delay } if delay.is_zero() => {
                    record.requeue();
                    lane.ready.push_back(job_id);
                    tracing::debug!(queue = %queue, job_id = %job_id, attempts = record.job.attempts, "job requeued");
                    Some(Arc::clone(&lane.notify))
                }
                Decision::Retry { delay } => {
                    let next_run_at = Instant::now() + delay;
                    record.schedule_retry(next_run_at);
                    lane.scheduled.push(ScheduledJob {
                        next_run_at,
                        job_id,
                    });
                    tracing::debug!(
                        queue = %queue,
                        job_id = %job_id,
                        attempts = record.job.attempts,
                        delay_ms = delay.as_millis() as u64,
                        "job retry scheduled"
                    );
                    // 待機中の lease に新しい起床時刻を知らせる
                    Some(Arc::clone(&lane.notify))
                }
                Decision::DeadLetter => {
                    record.mark_dead();
                    lane.dead.push(job_id);
                    tracing::warn!(
                        queue = %queue,
                        job_id = %job_id,
                        attempts = record.job.attempts,
                        reason = record.job.last_error.as_deref().unwrap_or_default(),
                        "job dead-lettered"
                    );
                    None
                }
            }
        };

        if let Some(notify) = notify {
            notify.notify_one();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn queue() -> QueueName {
        QueueName::new("test")
    }

    fn store() -> InMemoryJobStore {
        InMemoryJobStore::new(RetryPolicy::immediate()).with_poll_interval(Duration::from_millis(50))
    }

    #[tokio::test]
    async fn enqueue_and_counts() {
        let store = store();
        store.enqueue(&queue(), json!({"a": 1})).await.unwrap();

        let counts = store.counts(&queue()).await.unwrap();
        assert_eq!(counts.queued, 1);
        assert_eq!(counts.running, 0);
    }

    #[tokio::test]
    async fn lease_transitions_to_running() {
        let store = store();
        let id = store.enqueue(&queue(), json!({"a": 1})).await.unwrap();

        let lease = store.lease(&queue()).await.unwrap().unwrap();
        assert_eq!(lease.job().id(), id);
        assert_eq!(lease.job().payload(), &json!({"a": 1}));

        let counts = store.counts(&queue()).await.unwrap();
        assert_eq!(counts.queued, 0);
        assert_eq!(counts.running, 1);
    }

    #[tokio::test]
    async fn ack_marks_succeeded() {
        let store = store();
        let id = store.enqueue(&queue(), json!({})).await.unwrap();
        let lease = store.lease(&queue()).await.unwrap().unwrap();
        lease.ack().await.unwrap();

        assert_eq!(store.get(id).await.unwrap().state, JobState::Succeeded);
        let counts = store.counts(&queue()).await.unwrap();
        assert_eq!(counts.succeeded, 1);
        assert_eq!(counts.running, 0);
    }

    #[tokio::test]
    async fn lease_times_out_on_empty_queue() {
        let store = store();
        let start = Instant::now();
        assert!(store.lease(&queue()).await.unwrap().is_none());
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn queues_are_isolated() {
        let store = store();
        store.enqueue(&QueueName::new("a"), json!({"q": "a"})).await.unwrap();

        assert!(store.lease(&QueueName::new("b")).await.unwrap().is_none());
        let lease = store.lease(&QueueName::new("a")).await.unwrap().unwrap();
        assert_eq!(lease.job().payload()["q"], "a");
    }

    #[tokio::test]
    async fn jobs_are_delivered_in_fifo_order() {
        let store = store();
        let first = store.enqueue(&queue(), json!({"n": 1})).await.unwrap();
        let second = store.enqueue(&queue(), json!({"n": 2})).await.unwrap();

        let a = store.lease(&queue()).await.unwrap().unwrap();
        let b = store.lease(&queue()).await.unwrap().unwrap();
        assert_eq!(a.job().id(), first);
        assert_eq!(b.job().id(), second);
    }

    #[tokio::test]
    async fn enqueue_wakes_waiting_lease() {
        let store = Arc::new(
            InMemoryJobStore::new(RetryPolicy::immediate()).with_poll_interval(Duration::from_secs(5)),
        );

        let waiter = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.lease(&queue()).await.unwrap().map(|l| l.job().id()) }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        let id = store.enqueue(&queue(), json!({})).await.unwrap();

        let leased = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(leased, Some(id));
    }

    #[tokio::test]
    async fn failed_job_is_redelivered_with_reason_recorded() {
        let store = store();
        let id = store.enqueue(&queue(), json!({})).await.unwrap();

        let lease = store.lease(&queue()).await.unwrap().unwrap();
        lease.fail("File not found".to_string()).await.unwrap();

        let again = store.lease(&queue()).await.unwrap().unwrap();
        assert_eq!(again.job().id(), id);
        assert_eq!(again.job().attempts, 1);
        assert_eq!(again.job().last_error.as_deref(), Some("File not found"));
    }

    #[tokio::test]
    async fn exhausted_job_is_dead_lettered() {
        let store = store().with_max_attempts(2);
        let id = store.enqueue(&queue(), json!({"userId": "u1"})).await.unwrap();

        for reason in ["first", "second"] {
            let lease = store.lease(&queue()).await.unwrap().unwrap();
            lease.fail(reason.to_string()).await.unwrap();
        }

        assert!(store.lease(&queue()).await.unwrap().is_none());
        assert_eq!(store.get(id).await.unwrap().state, JobState::Dead);

        let dead = store.dead_letters(&queue()).await;
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].attempts, 2);
        assert_eq!(dead[0].last_error.as_deref(), Some("second"));
        assert_eq!(store.counts(&queue()).await.unwrap().dead, 1);
    }

    #[tokio::test]
    async fn backoff_delays_redelivery() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(200),
            multiplier: 2.0,
            jitter: Duration::ZERO,
            max_delay: Duration::from_secs(1),
        };
        let store = InMemoryJobStore::new(policy).with_poll_interval(Duration::from_millis(20));
        store.enqueue(&queue(), json!({})).await.unwrap();

        let lease = store.lease(&queue()).await.unwrap().unwrap();
        lease.fail("transient".to_string()).await.unwrap();

        assert!(store.lease(&queue()).await.unwrap().is_none());
        assert_eq!(store.counts(&queue()).await.unwrap().retry_scheduled, 1);

        tokio::time::sleep(Duration::from_millis(250)).await;
        let lease = store.lease(&queue()).await.unwrap().unwrap();
        assert_eq!(lease.job().attempts, 1);
    }

    #[tokio::test]
    async fn double_ack_is_rejected() {
        let store = store();
        store.enqueue(&queue(), json!({})).await.unwrap();
        let lease = store.lease(&queue()).await.unwrap().unwrap();
        let stale = InMemoryLease {
            job: lease.job().clone(),
            state: Arc::clone(&store.state),
            retry_policy: RetryPolicy::immediate(),
        };
        lease.ack().await.unwrap();

        let err = Box::new(stale).ack().await.unwrap_err();
        assert!(matches!(err, StoreError::NotLeased(_)));
    }
}
