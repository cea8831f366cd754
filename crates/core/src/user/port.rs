use super::entity::{
    PasswordResetToken, User, UserUpdate, VerificationChannel, VerificationCode,
};
use super::registration::NewAccount;
use crate::common::Page;
use crate::store::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// # Summary
/// Account persistence.
///
/// # Invariants
/// - Emails passed in are already normalized by the caller.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// # Summary
    /// Inserts a brand-new account.
    ///
    /// # Returns
    /// * `Err(StoreError::Duplicate)` if the email is already registered.
    async fn create_user(&self, user: &User) -> Result<(), StoreError>;

    /// # Summary
    /// Inserts the user, an empty wallet, the user's referral code and the
    /// optional referrer link (bumping the referrer's count) atomically.
    ///
    /// # Returns
    /// * `Err(StoreError::Duplicate)` if the email or the code is taken;
    ///   nothing is written in that case.
    async fn create_account(&self, account: &NewAccount) -> Result<(), StoreError>;

    /// # Summary
    /// Applies one targeted change and returns the account as stored.
    ///
    /// # Returns
    /// * `Err(StoreError::NotFound)` if no account has this email.
    async fn update_user(
        &self,
        email: &str,
        update: &UserUpdate,
        now: DateTime<Utc>,
    ) -> Result<User, StoreError>;

    /// Accounts ordered by creation time, newest first.
    async fn list_users(&self, page: Page) -> Result<Vec<User>, StoreError>;
}

/// # Summary
/// One-time codes and password reset tokens.
#[async_trait]
pub trait VerificationStore: Send + Sync {
    /// Replaces any previous code for the same `(channel, target)`.
    async fn upsert_code(&self, code: &VerificationCode) -> Result<(), StoreError>;

    async fn get_code(
        &self,
        channel: VerificationChannel,
        target: &str,
    ) -> Result<Option<VerificationCode>, StoreError>;

    async fn delete_code(&self, channel: VerificationChannel, target: &str)
        -> Result<(), StoreError>;

    async fn save_reset_token(&self, token: &PasswordResetToken) -> Result<(), StoreError>;

    async fn get_reset_token(&self, token: &str) -> Result<Option<PasswordResetToken>, StoreError>;

    async fn delete_reset_token(&self, token: &str) -> Result<(), StoreError>;
}
