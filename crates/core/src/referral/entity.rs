use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// # Summary
/// A user's shareable referral code.
///
/// # Invariants
/// - `code` is unique and upper-case; each user owns at most one code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralCode {
    pub code: String,
    pub user_email: String,
    pub link: String,
    pub total_referrals: u64,
    pub total_earnings: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Referrer → referred relationship. A user is referred at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Referral {
    pub referrer_email: String,
    pub referred_email: String,
    pub referral_code: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReferralStats {
    pub total_referrals: u64,
    /// Referred users that have verified their email.
    pub active_referrals: u64,
    pub total_earnings: Decimal,
}
