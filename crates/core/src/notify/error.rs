use thiserror::Error;

/// # Summary
/// Outbound notification failures.
///
/// # Invariants
/// - Must derive `Error` via `thiserror`.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Network or transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Misconfiguration (bad address, missing token, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The delivery platform rejected the message
    #[error("Platform error: {0}")]
    Platform(String),

    /// The channel cannot reach this kind of recipient
    #[error("Unsupported recipient: {0}")]
    Unsupported(String),
}
