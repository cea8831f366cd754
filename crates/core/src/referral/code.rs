//! Referral code issuing and relationship registration.

use super::entity::{Referral, ReferralCode};
use super::error::ReferralError;
use super::port::ReferralStore;
use crate::store::error::StoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Uniqueness attempts before giving up.
pub const MAX_GENERATION_ATTEMPTS: usize = 10;

const PREFIX_LEN: usize = 3;

/// # Summary
/// Builds one candidate code.
///
/// # Logic
/// `PREFIX` (first three alphanumerics of the upper-cased local-part, padded
/// with `X`) + `random` + last four digits of the millisecond timestamp.
pub fn candidate_code(email: &str, random: &str, now_ms: i64) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let mut prefix: String = local
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .take(PREFIX_LEN)
        .collect();
    while prefix.len() < PREFIX_LEN {
        prefix.push('X');
    }
    format!("{}{}{:04}", prefix, random.to_uppercase(), now_ms.rem_euclid(10_000))
}

pub fn referral_link(base_url: &str, code: &str) -> String {
    format!("{}/join?ref={}", base_url.trim_end_matches('/'), code)
}

/// # Summary
/// Returns the user's referral code, creating one on first use.
///
/// # Logic
/// 1. Existing code → returned unchanged.
/// 2. Up to [`MAX_GENERATION_ATTEMPTS`] candidates are tried; a candidate is
///    skipped when the point lookup finds it or the insert loses a race.
///
/// # Arguments
/// * `random_suffix` - source of the random middle part of each candidate.
pub async fn issue_code<F>(
    store: &dyn ReferralStore,
    email: &str,
    base_url: &str,
    now: DateTime<Utc>,
    mut random_suffix: F,
) -> Result<ReferralCode, ReferralError>
where
    F: FnMut() -> String + Send,
{
    if let Some(existing) = store.get_code_for_user(email).await? {
        return Ok(existing);
    }

    for attempt in 1..=MAX_GENERATION_ATTEMPTS {
        let code = candidate_code(email, &random_suffix(), now.timestamp_millis());
        if store.find_code(&code).await?.is_some() {
            tracing::debug!("Referral code collision on attempt {}: {}", attempt, code);
            continue;
        }

        let record = ReferralCode {
            link: referral_link(base_url, &code),
            code,
            user_email: email.to_string(),
            total_referrals: 0,
            total_earnings: Decimal::ZERO,
            created_at: now,
        };
        match store.insert_code(&record).await {
            Ok(()) => {
                tracing::info!("Issued referral code {} to {}", record.code, email);
                return Ok(record);
            }
            Err(StoreError::Duplicate(_)) => {
                // The owner may have been given a code concurrently.
                if let Some(existing) = store.get_code_for_user(email).await? {
                    return Ok(existing);
                }
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(ReferralError::GenerationExhausted(MAX_GENERATION_ATTEMPTS))
}

/// # Summary
/// Links `new_user_email` to the owner of `code`.
///
/// # Returns
/// * `InvalidCode` for unknown codes, `SelfReferral` for own codes,
///   `AlreadyReferred` if the user already has a referrer.
pub async fn register_referral(
    store: &dyn ReferralStore,
    code: &str,
    new_user_email: &str,
    now: DateTime<Utc>,
) -> Result<Referral, ReferralError> {
    let owner = store
        .find_code(code.trim())
        .await?
        .ok_or_else(|| ReferralError::InvalidCode(code.to_string()))?;

    if owner.user_email == new_user_email {
        return Err(ReferralError::SelfReferral);
    }
    if store.get_referrer(new_user_email).await?.is_some() {
        return Err(ReferralError::AlreadyReferred(new_user_email.to_string()));
    }

    let referral = Referral {
        referrer_email: owner.user_email,
        referred_email: new_user_email.to_string(),
        referral_code: owner.code,
        created_at: now,
    };
    match store.record_referral(&referral).await {
        Ok(()) => Ok(referral),
        Err(StoreError::Duplicate(_)) => {
            Err(ReferralError::AlreadyReferred(new_user_email.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_code_layout() {
        assert_eq!(candidate_code("john.doe@x.com", "a1b2", 1_700_000_004_321), "JOHA1B24321");
        assert_eq!(candidate_code("j@x.com", "ZZZZ", 7), "JXXZZZZ0007");
        assert_eq!(candidate_code("a.b-c@x.com", "0000", 12_345), "ABC00002345");
    }

    #[test]
    fn test_referral_link() {
        assert_eq!(
            referral_link("https://ticgloballtd.com/", "JOHA1B24321"),
            "https://ticgloballtd.com/join?ref=JOHA1B24321"
        );
    }
}
