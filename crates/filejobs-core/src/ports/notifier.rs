//! Notifier port - outbound messages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::JobError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailEnvelope {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Delivers one message per call. Retrying is the job store's business.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, envelope: &MailEnvelope) -> Result<(), JobError>;
}
