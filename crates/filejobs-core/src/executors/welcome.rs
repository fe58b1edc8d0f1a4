use std::sync::Arc;

use async_trait::async_trait;

use crate::config::SenderConfig;
use crate::domain::{Artifact, Outcome, UserRecord, WelcomeJobPayload};
use crate::error::JobError;
use crate::ports::{MailEnvelope, Notifier, RecordLookup};
use crate::typed::Handler;

pub const WELCOME_SUBJECT: &str = "Welcome to Files Manager";

/// Build the welcome message for `user`.
pub fn welcome_envelope(sender: &SenderConfig, user: &UserRecord) -> MailEnvelope {
    let name = escape_html(user.display_name());
    let html = format!(
        "<div><h3>Hello {name} 👋🏼,</h3>\
         Welcome to <strong>Files Manager</strong>, \
         a simple file management API for uploading, listing and sharing files. \
         We hope it meets your needs 🙂.</div>"
    );

    MailEnvelope {
        from: sender.mailbox(),
        to: user.email.clone(),
        subject: WELCOME_SUBJECT.to_string(),
        html,
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Sends one welcome message per job. Delivery is attempted exactly once;
/// a refused send becomes a failure for the job store to redeliver.
pub struct WelcomeExecutor {
    records: Arc<dyn RecordLookup>,
    notifier: Arc<dyn Notifier>,
    sender: SenderConfig,
}

impl WelcomeExecutor {
    pub fn new(records: Arc<dyn RecordLookup>, notifier: Arc<dyn Notifier>, sender: SenderConfig) -> Self {
        Self {
            records,
            notifier,
            sender,
        }
    }

    /// Run the job; returns the recipient address.
    pub async fn execute(&self, payload: &WelcomeJobPayload) -> Result<String, JobError> {
        let user_id = payload.user_id()?;
        let user = self
            .records
            .find_user(user_id)
            .await?
            .ok_or(JobError::NotFound("User"))?;

        let envelope = welcome_envelope(&self.sender, &user);
        self.notifier.send(&envelope).await?;
        Ok(envelope.to)
    }
}

#[async_trait]
impl Handler<WelcomeJobPayload> for WelcomeExecutor {
    async fn handle(&self, task: WelcomeJobPayload) -> Result<Outcome, JobError> {
        match self.execute(&task).await {
            Ok(recipient) => {
                tracing::info!(user_id = ?task.user_id, "welcome message sent");
                Ok(Outcome::success().with_artifact(Artifact::Recipient(recipient)))
            }
            Err(err) => {
                tracing::warn!(user_id = ?task.user_id, reason = %err, "welcome job failed");
                Ok(Outcome::failure(err.to_string()))
            }
        }
    }
}
