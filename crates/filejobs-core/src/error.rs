use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while executing a job.
///
/// The `Display` output is the failure reason handed back to the job store,
/// so validation and lookup variants render the exact reasons producers
/// expect (`Missing fileId`, `File not found`, ...).
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Missing {0}")]
    Validation(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("record lookup failed: {0}")]
    Lookup(String),

    #[error("thumbnail generation failed: {0}")]
    Generation(String),

    #[error("write {} failed: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("payload decode: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors raised by a job store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("stored job is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("job {0} is not leased")]
    NotLeased(String),
}
