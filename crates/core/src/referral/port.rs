use super::entity::{Referral, ReferralCode, ReferralStats};
use crate::store::error::StoreError;
use async_trait::async_trait;

/// # Summary
/// Referral codes and relationships.
#[async_trait]
pub trait ReferralStore: Send + Sync {
    async fn get_code_for_user(&self, email: &str) -> Result<Option<ReferralCode>, StoreError>;

    /// Case-insensitive lookup.
    async fn find_code(&self, code: &str) -> Result<Option<ReferralCode>, StoreError>;

    /// `Err(Duplicate)` if the code or the owner already has a row.
    async fn insert_code(&self, code: &ReferralCode) -> Result<(), StoreError>;

    /// # Summary
    /// Stores the relationship and bumps the referrer's `total_referrals`
    /// in one transaction.
    ///
    /// # Returns
    /// * `Err(Duplicate)` if `referred_email` already has a referrer.
    async fn record_referral(&self, referral: &Referral) -> Result<(), StoreError>;

    async fn get_referrer(&self, referred_email: &str) -> Result<Option<Referral>, StoreError>;

    async fn list_referrals(&self, referrer_email: &str) -> Result<Vec<Referral>, StoreError>;

    async fn stats(&self, referrer_email: &str) -> Result<ReferralStats, StoreError>;
}
