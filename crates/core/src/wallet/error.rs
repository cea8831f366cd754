use super::entity::WalletAccount;
use rust_decimal::Decimal;
use thiserror::Error;

/// # Summary
/// Errors raised by wallet postings and transfer planning.
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Wallet not found: {0}")]
    NotFound(String),

    #[error("Insufficient {account} balance. Required: {required}, Available: {available}")]
    InsufficientBalance {
        account: WalletAccount,
        required: Decimal,
        available: Decimal,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Transfer route not allowed between the two slots / users.
    #[error("Invalid transfer: {0}")]
    InvalidTransfer(String),

    #[error("Storage error: {0}")]
    Storage(String),
}
