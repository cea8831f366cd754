//! Pure rules for one-time codes and reset tokens.

use super::entity::VerificationCode;
use chrono::{DateTime, Duration, Utc};

/// Validity window of an email/phone code.
pub const CODE_TTL_MINUTES: i64 = 30;
/// Validity window of a password reset token.
pub const RESET_TOKEN_TTL_HOURS: i64 = 24;

pub const CODE_MIN: u32 = 100_000;
pub const CODE_MAX: u32 = 999_999;

/// Outcome of comparing a submitted code with the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeCheck {
    Valid,
    /// Nothing on record for this target.
    Missing,
    Mismatch,
    /// Code matched the record but the record is past `expires_at`.
    Expired,
}

/// Maps an arbitrary random value onto the six-digit code range.
pub fn code_from_random(random: u32) -> String {
    let span = CODE_MAX - CODE_MIN + 1;
    (CODE_MIN + random % span).to_string()
}

/// Fresh random six-digit code.
pub fn generate_code() -> String {
    code_from_random(rand::random::<u32>())
}

pub fn code_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::minutes(CODE_TTL_MINUTES)
}

pub fn reset_token_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::hours(RESET_TOKEN_TTL_HOURS)
}

/// # Summary
/// Checks a submitted code.
///
/// # Logic
/// 1. No stored record → `Missing`.
/// 2. Different code → `Mismatch` (the record is kept).
/// 3. Same code but expired → `Expired`; the caller deletes the record.
/// 4. Otherwise `Valid`; the caller deletes the record and flips the flag.
pub fn check_code(stored: Option<&VerificationCode>, submitted: &str, now: DateTime<Utc>) -> CodeCheck {
    let Some(stored) = stored else {
        return CodeCheck::Missing;
    };
    if stored.code != submitted.trim() {
        return CodeCheck::Mismatch;
    }
    if now > stored.expires_at {
        return CodeCheck::Expired;
    }
    CodeCheck::Valid
}
