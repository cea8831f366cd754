use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access role carried in the session token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::User => write!(f, "user"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// KYC document review state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdentityStatus {
    NotSubmitted,
    Pending,
    Verified,
    Rejected,
}

impl fmt::Display for IdentityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IdentityStatus::NotSubmitted => "not_submitted",
            IdentityStatus::Pending => "pending",
            IdentityStatus::Verified => "verified",
            IdentityStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

impl FromStr for IdentityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_submitted" => Ok(IdentityStatus::NotSubmitted),
            "pending" => Ok(IdentityStatus::Pending),
            "verified" => Ok(IdentityStatus::Verified),
            "rejected" => Ok(IdentityStatus::Rejected),
            _ => Err(format!("Unknown identity status: {}", s)),
        }
    }
}

/// # Summary
/// Platform account. The lower-cased email is the identity key.
///
/// # Invariants
/// - `email` is unique and normalized.
/// - `profile_completed` implies every KYC profile field is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub country: Option<String>,
    pub country_of_birth: Option<String>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub identity_status: IdentityStatus,
    pub profile_completed: bool,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Fresh account with only the sign-up fields filled in.
    pub fn new(
        email: String,
        password_hash: String,
        country: Option<String>,
        role: UserRole,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            email,
            password_hash,
            first_name: None,
            last_name: None,
            date_of_birth: None,
            country,
            country_of_birth: None,
            gender: None,
            address: None,
            phone: None,
            email_verified: false,
            phone_verified: false,
            identity_status: IdentityStatus::NotSubmitted,
            profile_completed: false,
            role,
            created_at: now,
            updated_at: now,
        }
    }
}

/// # Summary
/// Targeted change to one account.
///
/// # Invariants
/// - Each variant writes only its own columns plus `updated_at`; a stale
///   in-memory [`User`] can never roll back another field.
#[derive(Debug, Clone)]
pub enum UserUpdate {
    EmailVerified,
    PhoneVerified { phone: String },
    /// Copies the KYC profile and sets `profile_completed`.
    Profile(ProfileDetails),
    /// Identity documents submitted: status `pending`, and `country` is
    /// filled only when the account has none.
    IdentitySubmitted { country: String },
    IdentityReviewed(IdentityStatus),
    PasswordHash(String),
    Role(UserRole),
}

/// Fields required by the profile-completion step.
#[derive(Debug, Clone)]
pub struct ProfileDetails {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub country_of_birth: String,
    pub gender: String,
    pub address: String,
}

/// Delivery channel of a one-time code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VerificationChannel {
    Email,
    Phone,
}

impl fmt::Display for VerificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationChannel::Email => write!(f, "email"),
            VerificationChannel::Phone => write!(f, "phone"),
        }
    }
}

impl FromStr for VerificationChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(VerificationChannel::Email),
            "phone" => Ok(VerificationChannel::Phone),
            _ => Err(format!("Unknown verification channel: {}", s)),
        }
    }
}

/// # Summary
/// Short-lived one-time code, one row per `(channel, target)`.
///
/// # Invariants
/// - Deleted on successful verification or once found expired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationCode {
    pub channel: VerificationChannel,
    /// Email address or phone number the code was sent to.
    pub target: String,
    /// Account that requested the code.
    pub user_email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetToken {
    pub token: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
