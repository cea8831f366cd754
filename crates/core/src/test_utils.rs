//! Test doubles shared by the integration tests of downstream crates.

use crate::notify::entity::Recipient;
use crate::notify::error::NotifyError;
use crate::notify::port::Notifier;
use async_trait::async_trait;
use tokio::sync::Mutex;

/// A message captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: Recipient,
    pub subject: String,
    pub content: String,
}

/// # Summary
/// Notifier that keeps every message in memory instead of delivering it,
/// so tests can read verification codes back.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMessage>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    /// Most recent message addressed to `recipient`.
    pub async fn last_to(&self, recipient: &Recipient) -> Option<SentMessage> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|m| &m.recipient == recipient)
            .cloned()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, recipient: &Recipient, subject: &str, content: &str) -> Result<(), NotifyError> {
        self.sent.lock().await.push(SentMessage {
            recipient: recipient.clone(),
            subject: subject.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }
}
