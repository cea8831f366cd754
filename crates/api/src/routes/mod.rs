pub mod admin;
pub mod auth;
pub mod deposit;
pub mod notification;
pub mod partner;
pub mod payment;
pub mod referral;
pub mod subscription;
pub mod wallet;
pub mod withdrawal;

use tic_core::notify::entity::Recipient;

use crate::error::ApiError;
use crate::server::AppState;

/// Trimmed value of a mandatory field, or a 400 naming the requirement.
pub(crate) fn required(value: Option<String>, message: &str) -> Result<String, ApiError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::BadRequest(message.to_string())),
    }
}

/// Non-empty trimmed optional field.
pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Best-effort delivery: failures are logged, never returned.
pub(crate) async fn notify_quietly(state: &AppState, recipient: &Recipient, subject: &str, content: &str) {
    if let Err(e) = state.notifier.notify(recipient, subject, content).await {
        tracing::warn!("Failed to notify {}: {}", recipient, e);
    }
}
