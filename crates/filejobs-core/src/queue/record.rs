//! Job record: job + state.

use std::time::Instant;

use super::JobState;
use crate::domain::Job;

/// Single source of truth for a job inside the in-memory store.
/// Queue structures (ready/scheduled/dead) hold `JobId`s only.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job: Job,
    pub state: JobState,

    /// When to retry next (for RetryScheduled state).
    pub next_run_at: Option<Instant>,

    pub created_at: Instant,
    pub updated_at: Instant,
}

impl JobRecord {
    pub fn new(job: Job) -> Self {
        let now = Instant::now();
        Self {
            job,
            state: JobState::Queued,
            next_run_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn start_attempt(&mut self) {
        self.state = JobState::Running;
        self.updated_at = Instant::now();
    }

    pub fn mark_succeeded(&mut self) {
        self.state = JobState::Succeeded;
        self.updated_at = Instant::now();
    }

    /// Count the failed execution without deciding what happens next.
    pub fn record_failure(&mut self, reason: String) {
        self.job.record_failure(reason);
        self.updated_at = Instant::now();
    }

    pub fn mark_dead(&mut self) {
        self.state = JobState::Dead;
        self.next_run_at = None;
        self.updated_at = Instant::now();
    }

    pub fn schedule_retry(&mut self, next_run_at: Instant) {
        self.state = JobState::RetryScheduled;
        self.next_run_at = Some(next_run_at);
        self.updated_at = Instant::now();
    }

    /// RetryScheduled -> Queued.
    pub fn requeue(&mut self) {
        self.state = JobState::Queued;
        self.next_run_at = None;
        self.updated_at = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QueueName;

    fn record(max_attempts: u32) -> JobRecord {
        JobRecord::new(Job::new(QueueName::new("q"), serde_json::json!({}), max_attempts))
    }

    #[test]
    fn failure_then_retry_then_requeue() {
        let mut r = record(3);
        r.start_attempt();
        r.record_failure("boom".to_string());
        r.schedule_retry(Instant::now());
        assert_eq!(r.state, JobState::RetryScheduled);
        assert_eq!(r.job.attempts, 1);

        r.requeue();
        assert_eq!(r.state, JobState::Queued);
        assert!(r.next_run_at.is_none());
    }

    #[test]
    fn dead_keeps_last_error() {
        let mut r = record(1);
        r.start_attempt();
        r.record_failure("gave up".to_string());
        r.mark_dead();
        assert!(r.state.is_terminal());
        assert_eq!(r.job.last_error.as_deref(), Some("gave up"));
    }
}
