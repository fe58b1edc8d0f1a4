//! Retry policy: decides between retry-with-backoff and dead-letter.

use std::time::Duration;

use rand::Rng;

use crate::domain::Job;

/// What the store does with a job whose execution just failed.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Retry { delay: Duration },
    DeadLetter,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Base delay for the first retry.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Upper bound of the random delay added to every retry.
    pub jitter: Duration,

    /// Cap on the backoff delay (before jitter).
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// 2s base, doubling up to 5 minutes, up to 250ms of jitter.
    pub fn default_policy() -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
            jitter: Duration::from_millis(250),
            max_delay: Duration::from_secs(300),
        }
    }

    /// Retry immediately. Used by tests and by callers that want redelivery
    /// without backoff.
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            multiplier: 1.0,
            jitter: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before the next retry: `base_delay * multiplier^(attempts - 1)`,
    /// capped at `max_delay`.
    ///
    /// `attempts` is the number of executions already made (1-indexed);
    /// 0 is treated like 1.
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        // overflow and NaN both land on the cap
        Duration::try_from_secs_f64(delay_secs)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    fn jittered_delay(&self, attempts: u32) -> Duration {
        let delay = self.next_delay(attempts);
        let max_jitter = self.jitter.as_millis() as u64;
        if max_jitter == 0 {
            return delay;
        }
        delay + Duration::from_millis(rand::thread_rng().gen_range(0..=max_jitter))
    }

    /// Decide the fate of a job whose failure has already been recorded.
    pub fn decide(&self, job: &Job) -> Decision {
        if job.has_attempts_left() {
            Decision::Retry {
                delay: self.jittered_delay(job.attempts),
            }
        } else {
            Decision::DeadLetter
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::default_policy()
    }
}
