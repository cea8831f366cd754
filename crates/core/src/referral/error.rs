use crate::store::error::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReferralError {
    #[error("Invalid referral code: {0}")]
    InvalidCode(String),

    #[error("User {0} already has a referrer")]
    AlreadyReferred(String),

    #[error("Users cannot refer themselves")]
    SelfReferral,

    /// No free code found within the attempt budget.
    #[error("Failed to generate a unique referral code after {0} attempts")]
    GenerationExhausted(usize),

    #[error(transparent)]
    Store(#[from] StoreError),
}
