//! Job: the unit a job store delivers to a worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{JobId, QueueName};

/// Queue name + payload (+ delivery bookkeeping).
///
/// The payload is immutable once enqueued. `attempts` counts finished
/// executions and is only advanced by the store when a lease fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    id: JobId,
    queue: QueueName,
    payload: serde_json::Value,
    #[serde(default)]
    pub attempts: u32,
    pub max_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub enqueued_at: DateTime<Utc>,
}

impl Job {
    pub fn new(queue: QueueName, payload: serde_json::Value, max_attempts: u32) -> Self {
        Self {
            id: JobId::generate(),
            queue,
            payload,
            attempts: 0,
            max_attempts,
            last_error: None,
            enqueued_at: Utc::now(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn queue(&self) -> &QueueName {
        &self.queue
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Record a failed execution.
    pub fn record_failure(&mut self, reason: impl Into<String>) {
        self.attempts += 1;
        self.last_error = Some(reason.into());
    }

    /// Whether another execution is allowed after the last failure.
    pub fn has_attempts_left(&self) -> bool {
        self.attempts < self.max_attempts
    }
}
