use crate::wallet::error::WalletError;
use thiserror::Error;

/// # Summary
/// Errors of the deposit / withdrawal workflow.
#[derive(Error, Debug)]
pub enum FundingError {
    #[error("{0} not found")]
    NotFound(String),

    /// The request is not in a state that allows the transition.
    #[error("{kind} {id} is already {status}")]
    InvalidState {
        kind: &'static str,
        id: String,
        status: String,
    },

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error("Storage error: {0}")]
    Storage(String),
}
