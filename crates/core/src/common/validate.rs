//! Input validation shared by registration, login and the email checker.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$"));

static DOMAIN_RE: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9-]{0,61}[a-zA-Z0-9]?\.[a-zA-Z]{2,}$")
});

const PASSWORD_SPECIALS: &str = "!@#$%^&*(),.?\":{}|<>";
const PASSWORD_MIN_LEN: usize = 8;
const PASSWORD_MAX_LEN: usize = 15;

pub const DISPOSABLE_DOMAINS: &[&str] = &[
    "10minutemail.com",
    "tempmail.org",
    "guerrillamail.com",
    "mailinator.com",
    "yopmail.com",
    "temp-mail.org",
    "throwaway.email",
    "getnada.com",
    "maildrop.cc",
    "sharklasers.com",
];

pub const KNOWN_PROVIDERS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "outlook.com",
    "hotmail.com",
    "live.com",
    "icloud.com",
    "aol.com",
    "protonmail.com",
    "proton.me",
    "zoho.com",
    "yandex.com",
    "mail.com",
];

/// Trims and lower-cases an email so it can be used as an identity key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Syntactic email check (`local@domain.tld`, no whitespace).
pub fn is_valid_email(email: &str) -> bool {
    match EMAIL_RE.as_ref() {
        Ok(re) => re.is_match(email.trim()),
        Err(_) => false,
    }
}

/// # Summary
/// Enforces the account password policy.
///
/// # Logic
/// 1. Length must be within 8..=15 characters.
/// 2. Requires an upper-case letter, a lower-case letter, a digit and one
///    of `!@#$%^&*(),.?":{}|<>`.
///
/// # Returns
/// * `Err(message)` naming the first unmet rule.
pub fn check_password(password: &str) -> Result<(), String> {
    let len = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(format!(
            "Password must be between {} and {} characters",
            PASSWORD_MIN_LEN, PASSWORD_MAX_LEN
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err("Password must contain at least one uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err("Password must contain at least one lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one number".to_string());
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        return Err("Password must contain at least one special character".to_string());
    }
    Ok(())
}

/// Result of [`inspect_email`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmailInspection {
    pub is_valid: bool,
    pub is_disposable: bool,
    pub is_known_provider: bool,
    pub domain: Option<String>,
    pub reason: Option<String>,
}

impl EmailInspection {
    fn invalid(domain: Option<String>, reason: &str) -> Self {
        Self {
            is_valid: false,
            is_disposable: false,
            is_known_provider: false,
            domain,
            reason: Some(reason.to_string()),
        }
    }
}

/// # Summary
/// Classifies an address for the sign-up form. Never fails: any problem is
/// reported through `is_valid = false` and a `reason`.
///
/// # Logic
/// 1. Syntax check.
/// 2. Domain shape check.
/// 3. Disposable domains are rejected, known providers are flagged.
pub fn inspect_email(email: &str) -> EmailInspection {
    let email = normalize_email(email);
    if email.is_empty() {
        return EmailInspection::invalid(None, "Email is required");
    }
    if !is_valid_email(&email) {
        return EmailInspection::invalid(None, "Invalid email format");
    }

    let domain = match email.rsplit_once('@') {
        Some((_, domain)) => domain.to_string(),
        None => return EmailInspection::invalid(None, "Invalid email format"),
    };

    let domain_ok = match DOMAIN_RE.as_ref() {
        Ok(re) => re.is_match(&domain),
        Err(_) => false,
    };
    if !domain_ok {
        return EmailInspection::invalid(Some(domain), "Invalid email domain");
    }

    if DISPOSABLE_DOMAINS.contains(&domain.as_str()) {
        return EmailInspection {
            is_valid: false,
            is_disposable: true,
            is_known_provider: false,
            domain: Some(domain),
            reason: Some("Disposable email addresses are not allowed".to_string()),
        };
    }

    EmailInspection {
        is_valid: true,
        is_disposable: false,
        is_known_provider: KNOWN_PROVIDERS.contains(&domain.as_str()),
        domain: Some(domain),
        reason: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_syntax() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("  bob.smith@mail.co.uk "));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("alice example.com"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn test_password_policy() {
        assert!(check_password("Passw0rd!").is_ok());
        assert!(check_password("Sh0rt!").is_err());
        assert!(check_password("ThisIsWayTooLong1!").is_err());
        assert!(check_password("password1!").is_err());
        assert!(check_password("PASSWORD1!").is_err());
        assert!(check_password("Password!!").is_err());
        assert!(check_password("Password12").is_err());
    }

    #[test]
    fn test_inspect_email_never_fails() {
        let bad = inspect_email("not-an-email");
        assert!(!bad.is_valid);
        assert_eq!(bad.reason.as_deref(), Some("Invalid email format"));

        let empty = inspect_email("");
        assert!(!empty.is_valid);

        let disposable = inspect_email("someone@Mailinator.com");
        assert!(!disposable.is_valid);
        assert!(disposable.is_disposable);

        let known = inspect_email("someone@gmail.com");
        assert!(known.is_valid);
        assert!(known.is_known_provider);

        let corporate = inspect_email("ops@ticgloballtd.com");
        assert!(corporate.is_valid);
        assert!(!corporate.is_known_provider);
        assert_eq!(corporate.domain.as_deref(), Some("ticgloballtd.com"));
    }
}
