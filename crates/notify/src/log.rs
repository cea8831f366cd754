use async_trait::async_trait;
use tic_core::notify::entity::Recipient;
use tic_core::notify::error::NotifyError;
use tic_core::notify::port::Notifier;

/// # Summary
/// Writes notifications to the tracing log instead of delivering them.
///
/// # Logic
/// The subject is logged at `info`; the body (which may carry a one-time
/// code) only at `debug`. Accepts every recipient kind, so it doubles as
/// the SMS stand-in.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, recipient: &Recipient, subject: &str, content: &str) -> Result<(), NotifyError> {
        tracing::info!("Notification to {}: {}", recipient, subject);
        tracing::debug!("Notification body for {}: {}", recipient, content);
        Ok(())
    }
}
