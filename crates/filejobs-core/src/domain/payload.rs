//! Queue payloads.
//!
//! Fields are optional at the type level so a payload with a missing id still
//! decodes; the executors report the missing field as a validation failure.

use serde::{Deserialize, Serialize};

use crate::error::JobError;
use crate::typed::Task;

use super::ids::QueueName;

/// Payload of the `file-queue`: generate thumbnails for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailJobPayload {
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl ThumbnailJobPayload {
    pub fn new(file_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            file_id: Some(file_id.into()),
            user_id: Some(user_id.into()),
        }
    }

    pub fn file_id(&self) -> Result<&str, JobError> {
        required(&self.file_id, "fileId")
    }

    pub fn user_id(&self) -> Result<&str, JobError> {
        required(&self.user_id, "userId")
    }
}

impl Task for ThumbnailJobPayload {
    const QUEUE: &'static str = QueueName::FILES;
}

/// Payload of the `userQueue`: welcome a newly registered user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeJobPayload {
    #[serde(default)]
    pub user_id: Option<String>,
}

impl WelcomeJobPayload {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    pub fn user_id(&self) -> Result<&str, JobError> {
        required(&self.user_id, "userId")
    }
}

impl Task for WelcomeJobPayload {
    const QUEUE: &'static str = QueueName::USERS;
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, JobError> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(JobError::Validation(field)),
    }
}
