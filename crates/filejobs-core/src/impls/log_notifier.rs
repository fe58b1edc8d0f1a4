use async_trait::async_trait;

use crate::error::JobError;
use crate::ports::{MailEnvelope, Notifier};

/// Logs the envelope instead of delivering it.
///
/// Stand-in for a mail transport in development deployments.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, envelope: &MailEnvelope) -> Result<(), JobError> {
        tracing::info!(
            from = %envelope.from,
            to = %envelope.to,
            subject = %envelope.subject,
            body_len = envelope.html.len(),
            "mail sent"
        );
        Ok(())
    }
}
