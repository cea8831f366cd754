use crate::store::error::StoreError;
use crate::wallet::error::WalletError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Payment plan not found")]
    NotFound,

    #[error("Payment plan {0} is not available")]
    Inactive(String),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for PlanError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => PlanError::NotFound,
            other => PlanError::Storage(other.to_string()),
        }
    }
}
