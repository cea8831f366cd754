//! Sign-up: the account, its referral code and the optional referrer link,
//! written as one unit.

use super::entity::User;
use super::port::UserStore;
use crate::referral::code::{MAX_GENERATION_ATTEMPTS, candidate_code, referral_link};
use crate::referral::entity::{Referral, ReferralCode};
use crate::referral::error::ReferralError;
use crate::referral::port::ReferralStore;
use crate::store::error::StoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

/// Rows created by one sign-up. The store commits them in a single
/// transaction together with an empty wallet.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub user: User,
    pub referral_code: ReferralCode,
    pub referral: Option<Referral>,
}

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("User already exists")]
    EmailTaken,

    #[error(transparent)]
    Referral(#[from] ReferralError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// # Summary
/// Creates `user` with a fresh referral code, linked to `referrer` if given.
///
/// # Logic
/// 1. Up to [`MAX_GENERATION_ATTEMPTS`] candidate codes are tried; known
///    codes are skipped before the write.
/// 2. A unique violation on commit means either the email or the code was
///    taken concurrently. The email wins: if the account now exists the
///    sign-up fails with `EmailTaken`, otherwise the next candidate is tried.
///
/// # Arguments
/// * `referrer` - the referral code the user signed up with, already looked up.
pub async fn open_account<F>(
    users: &dyn UserStore,
    referrals: &dyn ReferralStore,
    user: User,
    referrer: Option<&ReferralCode>,
    base_url: &str,
    now: DateTime<Utc>,
    mut random_suffix: F,
) -> Result<NewAccount, RegistrationError>
where
    F: FnMut() -> String + Send,
{
    if users.get_user(&user.email).await?.is_some() {
        return Err(RegistrationError::EmailTaken);
    }
    if referrer.is_some_and(|r| r.user_email == user.email) {
        return Err(ReferralError::SelfReferral.into());
    }

    let referral = referrer.map(|owner| Referral {
        referrer_email: owner.user_email.clone(),
        referred_email: user.email.clone(),
        referral_code: owner.code.clone(),
        created_at: now,
    });

    for attempt in 1..=MAX_GENERATION_ATTEMPTS {
        let code = candidate_code(&user.email, &random_suffix(), now.timestamp_millis());
        if referrals.find_code(&code).await?.is_some() {
            tracing::debug!("Referral code collision on attempt {}: {}", attempt, code);
            continue;
        }

        let account = NewAccount {
            user: user.clone(),
            referral_code: ReferralCode {
                link: referral_link(base_url, &code),
                code,
                user_email: user.email.clone(),
                total_referrals: 0,
                total_earnings: Decimal::ZERO,
                created_at: now,
            },
            referral: referral.clone(),
        };
        match users.create_account(&account).await {
            Ok(()) => return Ok(account),
            Err(StoreError::Duplicate(_)) => {
                if users.get_user(&user.email).await?.is_some() {
                    return Err(RegistrationError::EmailTaken);
                }
                tracing::debug!("Referral code {} taken during sign-up", account.referral_code.code);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(ReferralError::GenerationExhausted(MAX_GENERATION_ATTEMPTS).into())
}
