//! Domain model (ids, jobs, payloads, records, outcomes).

pub mod ids;
pub mod job;
pub mod outcome;
pub mod payload;
pub mod records;

pub use ids::{JobId, QueueName};
pub use job::Job;
pub use outcome::{Artifact, Outcome, OutcomeKind};
pub use payload::{ThumbnailJobPayload, WelcomeJobPayload};
pub use records::{FileRecord, UserRecord};
