use super::entity::{Notification, Recipient};
use crate::common::Page;
use crate::notify::error::NotifyError;
use crate::store::error::StoreError;
use async_trait::async_trait;

/// # Summary
/// Outbound message channel (SMTP, Telegram, logs, ...).
///
/// # Invariants
/// - Implementations are `Send + Sync` and may be called concurrently.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// # Summary
    /// Delivers `subject` / `content` to `recipient`.
    ///
    /// # Returns
    /// * `Err(NotifyError::Unsupported)` if this channel cannot reach the
    ///   recipient kind.
    async fn notify(
        &self,
        recipient: &Recipient,
        subject: &str,
        content: &str,
    ) -> Result<(), NotifyError>;
}

/// # Summary
/// In-app notification inbox.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create_notification(&self, notification: &Notification) -> Result<(), StoreError>;

    /// Newest first.
    async fn list_notifications(
        &self,
        email: &str,
        unread_only: bool,
        page: Page,
    ) -> Result<Vec<Notification>, StoreError>;

    async fn count_notifications(&self, email: &str, unread_only: bool) -> Result<u64, StoreError>;

    /// Marks the given ids (or every notification when `ids` is `None`) of
    /// `email` as read. Returns the number of rows changed.
    async fn mark_read(&self, email: &str, ids: Option<&[String]>) -> Result<u64, StoreError>;
}
