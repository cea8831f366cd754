use crate::email::EmailNotifier;
use crate::log::LogNotifier;
use crate::telegram::TelegramNotifier;
use async_trait::async_trait;
use std::sync::Arc;
use tic_core::config::NotifyConfig;
use tic_core::notify::entity::Recipient;
use tic_core::notify::error::NotifyError;
use tic_core::notify::port::Notifier;
use tracing::warn;

/// # Summary
/// Delivers each message through every channel able to reach the recipient.
///
/// # Logic
/// 1. Channels answering `Unsupported` are skipped silently.
/// 2. Other failures are logged and do not stop the remaining channels.
/// 3. Succeeds if at least one channel delivered.
pub struct FanoutNotifier {
    channels: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(channels: Vec<Arc<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// # Summary
    /// Builds the channel list from configuration.
    ///
    /// # Logic
    /// SMTP and Telegram are added when configured; the [`LogNotifier`] is
    /// always last so phone codes and unconfigured deployments still leave
    /// a trace.
    ///
    /// # Returns
    /// * `Err(NotifyError::Config)` if the SMTP section is invalid.
    pub fn from_config(cfg: &NotifyConfig) -> Result<Self, NotifyError> {
        let mut channels: Vec<Arc<dyn Notifier>> = Vec::new();
        if let Some(email) = &cfg.email {
            channels.push(Arc::new(EmailNotifier::from_config(email)?));
            tracing::info!("Email notifications enabled via {}", email.host);
        }
        if let Some(telegram) = &cfg.telegram {
            channels.push(Arc::new(TelegramNotifier::from_config(telegram)));
            tracing::info!("Telegram admin alerts enabled");
        }
        channels.push(Arc::new(LogNotifier));
        Ok(Self::new(channels))
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn notify(&self, recipient: &Recipient, subject: &str, content: &str) -> Result<(), NotifyError> {
        let mut delivered = 0usize;
        let mut last_error = None;

        for channel in &self.channels {
            match channel.notify(recipient, subject, content).await {
                Ok(()) => delivered += 1,
                Err(NotifyError::Unsupported(_)) => {}
                Err(e) => {
                    warn!("Notification channel failed for {}: {}", recipient, e);
                    last_error = Some(e);
                }
            }
        }

        if delivered > 0 {
            return Ok(());
        }
        Err(last_error.unwrap_or_else(|| NotifyError::Unsupported(recipient.to_string())))
    }
}
