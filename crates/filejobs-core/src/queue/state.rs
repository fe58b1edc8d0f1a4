//! Job state machine.

use serde::{Deserialize, Serialize};

/// State transitions:
/// - Queued -> Running -> Succeeded
/// - Queued -> Running -> RetryScheduled -> Queued (loop until max_attempts)
/// - Queued -> Running -> Dead (when max_attempts exceeded)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    /// Ready to run immediately.
    Queued,

    /// Leased by a worker.
    Running,

    Succeeded,

    /// Waiting for retry (delayed due to backoff).
    RetryScheduled,

    /// Dead-lettered (max_attempts exceeded).
    Dead,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Dead)
    }

    /// Eligible for lease?
    pub fn is_runnable(self) -> bool {
        matches!(self, JobState::Queued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(JobState::Queued, false, true)]
    #[case(JobState::Running, false, false)]
    #[case(JobState::Succeeded, true, false)]
    #[case(JobState::RetryScheduled, false, false)]
    #[case(JobState::Dead, true, false)]
    fn classification(#[case] state: JobState, #[case] terminal: bool, #[case] runnable: bool) {
        assert_eq!(state.is_terminal(), terminal);
        assert_eq!(state.is_runnable(), runnable);
    }
}
