//! # Authentication & KYC routes
//!
//! Sign-up, login, one-time codes, password reset and the profile / identity
//! steps of the KYC flow.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::NaiveDate;

use tic_core::common::id::{random_base36, secret_token};
use tic_core::common::validate::{check_password, inspect_email, is_valid_email, normalize_email};
use tic_core::notify::entity::Recipient;
use tic_core::store::error::StoreError;
use tic_core::user::entity::{
    IdentityStatus, PasswordResetToken, ProfileDetails, User, UserRole, UserUpdate,
    VerificationChannel, VerificationCode,
};
use tic_core::user::registration::open_account;
use tic_core::user::verification::{
    CodeCheck, check_code, code_expiry, generate_code, reset_token_expiry,
};

use crate::error::ApiError;
use crate::middleware::auth::{CurrentUser, issue_token};
use crate::routes::{notify_quietly, optional, required};
use crate::server::AppState;
use crate::types::{
    ApiResponse, CompleteProfileRequest, EmailCheckResponse, EmailRequest,
    IdentitySubmissionRequest, LoginRequest, LoginResponse, MessageResponse, PhoneCodeRequest,
    RegisterRequest, RegisterResponse, ResetPasswordRequest, UserResponse, VerifyCodeRequest,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Register a new account
///
/// Creates the user, the wallet and the user's own referral code, and links
/// the referrer when `referralId` is given, all in one transaction.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<RegisterResponse>),
        (status = 400, description = "Missing fields, invalid email/password, duplicate email or unknown referral code")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RegisterResponse>>), ApiError> {
    const MISSING: &str = "Email, password and country are required";
    let email = normalize_email(&required(req.email, MISSING)?);
    let password = required(req.password, MISSING)?;
    let country = required(req.country, MISSING)?;

    if !is_valid_email(&email) {
        return Err(ApiError::BadRequest("Invalid email format".into()));
    }
    check_password(&password).map_err(ApiError::BadRequest)?;

    // Validate the referral code before anything is written
    let referrer = match optional(req.referral_id) {
        Some(code) => Some(
            state
                .referrals
                .find_code(&code)
                .await?
                .ok_or_else(|| ApiError::BadRequest("Invalid referral code".into()))?,
        ),
        None => None,
    };

    if state.users.get_user(&email).await?.is_some() {
        return Err(ApiError::BadRequest("User already exists".into()));
    }

    let password_hash = bcrypt::hash(&password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))?;

    let now = state.clock.now();
    let user = User::new(email.clone(), password_hash, Some(country), UserRole::User, now);
    let account = open_account(
        state.users.as_ref(),
        state.referrals.as_ref(),
        user,
        referrer.as_ref(),
        &state.app_config.referral.base_url,
        now,
        || random_base36(4),
    )
    .await?;
    let referred_by = account.referral.map(|r| r.referrer_email);
    let (user, own_code) = (account.user, account.referral_code);

    tracing::info!("Registered {} (referred by {:?})", email, referred_by);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(RegisterResponse {
            user: UserResponse::from(&user),
            referral_code: own_code.code,
            referral_link: own_code.link,
            referred_by,
        })),
    ))
}

/// User login
///
/// Checks email and password and issues a JWT.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    const MISSING: &str = "Email and password are required";
    let email = normalize_email(&required(req.email, MISSING)?);
    let password = required(req.password, MISSING)?;

    let user = authenticate(&state, &email, &password).await?;

    let ttl = state.app_config.server.user_token_ttl_secs;
    let (token, _) = issue_token(&user, ttl, &state.app_config.server.jwt_secret, state.clock.now())?;
    tracing::info!("User {} logged in", user.email);

    Ok(Json(ApiResponse::ok(LoginResponse {
        token,
        expires_in: ttl,
        user: UserResponse::from(&user),
    })))
}

/// Password check shared by the user and admin logins.
///
/// # Returns
/// * `Err(Unauthorized)` without telling whether the account exists.
pub(crate) async fn authenticate(state: &AppState, email: &str, password: &str) -> Result<User, ApiError> {
    let user = state
        .users
        .get_user(email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.into()))?;

    let valid = bcrypt::verify(password, &user.password_hash).unwrap_or(false);
    if !valid {
        tracing::warn!("Failed login attempt for {}", email);
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.into()));
    }
    Ok(user)
}

/// Check an email address
///
/// Never fails: problems are reported through `isValid = false`.
#[utoipa::path(
    post,
    path = "/api/auth/verify-email",
    tag = "Auth",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Classification of the address", body = ApiResponse<EmailCheckResponse>)
    )
)]
pub async fn verify_email(Json(req): Json<EmailRequest>) -> Json<ApiResponse<EmailCheckResponse>> {
    let inspection = inspect_email(req.email.as_deref().unwrap_or_default());
    Json(ApiResponse::ok(inspection.into()))
}

/// Send an email verification code
#[utoipa::path(
    post,
    path = "/api/auth/send-verification",
    tag = "Auth",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Code sent", body = ApiResponse<MessageResponse>),
        (status = 400, description = "Missing or malformed email"),
        (status = 404, description = "No account for this email")
    )
)]
pub async fn send_verification(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let email = normalize_email(&required(req.email, "Email is required")?);
    if !is_valid_email(&email) {
        return Err(ApiError::BadRequest("Invalid email format".into()));
    }
    if state.users.get_user(&email).await?.is_none() {
        return Err(ApiError::NotFound("User not found".into()));
    }

    let now = state.clock.now();
    let code = VerificationCode {
        channel: VerificationChannel::Email,
        target: email.clone(),
        user_email: email.clone(),
        code: generate_code(),
        expires_at: code_expiry(now),
        created_at: now,
    };
    state.verifications.upsert_code(&code).await?;

    state
        .notifier
        .notify(
            &Recipient::Email(email.clone()),
            "Your TIC GLOBAL verification code",
            &format!(
                "Your verification code is {}. It expires in 30 minutes.",
                code.code
            ),
        )
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to send verification code: {}", e)))?;

    tracing::info!("Verification code sent to {}", email);
    Ok(Json(ApiResponse::ok(MessageResponse::new("Verification code sent"))))
}

/// Verify an email code
#[utoipa::path(
    post,
    path = "/api/auth/verify-code",
    tag = "Auth",
    request_body = VerifyCodeRequest,
    responses(
        (status = 200, description = "Email verified", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid or expired code")
    )
)]
pub async fn verify_code(
    State(state): State<AppState>,
    Json(req): Json<VerifyCodeRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    const MISSING: &str = "Email and code are required";
    let email = normalize_email(&required(req.email, MISSING)?);
    let submitted = required(req.code, MISSING)?;

    consume_code(&state, VerificationChannel::Email, &email, &email, &submitted).await?;

    let user = state
        .users
        .update_user(&email, &UserUpdate::EmailVerified, state.clock.now())
        .await
        .map_err(user_not_found)?;

    tracing::info!("Email verified for {}", email);
    Ok(Json(ApiResponse::ok(UserResponse::from(&user))))
}

/// # Summary
/// Checks a submitted code and deletes the record when it is used up.
///
/// # Logic
/// 1. A record requested by another account counts as missing.
/// 2. Expired records are deleted before the 400 is returned.
/// 3. A valid code is deleted so it cannot be replayed.
async fn consume_code(
    state: &AppState,
    channel: VerificationChannel,
    target: &str,
    owner: &str,
    submitted: &str,
) -> Result<(), ApiError> {
    let stored = state
        .verifications
        .get_code(channel, target)
        .await?
        .filter(|c| c.user_email == owner);

    match check_code(stored.as_ref(), submitted, state.clock.now()) {
        CodeCheck::Valid => {
            state.verifications.delete_code(channel, target).await?;
            Ok(())
        }
        CodeCheck::Expired => {
            state.verifications.delete_code(channel, target).await?;
            Err(ApiError::BadRequest("Verification code has expired".into()))
        }
        CodeCheck::Missing | CodeCheck::Mismatch => {
            tracing::warn!("Invalid {} verification code for {}", channel, target);
            Err(ApiError::BadRequest("Invalid verification code".into()))
        }
    }
}

/// Request a password reset link
///
/// Always answers 200 so accounts cannot be enumerated.
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    tag = "Auth",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Reset link sent if the account exists", body = ApiResponse<MessageResponse>),
        (status = 400, description = "Missing email")
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let email = normalize_email(&required(req.email, "Email is required")?);

    if state.users.get_user(&email).await?.is_some() {
        let now = state.clock.now();
        let token = PasswordResetToken {
            token: secret_token(),
            email: email.clone(),
            expires_at: reset_token_expiry(now),
            created_at: now,
        };
        state.verifications.save_reset_token(&token).await?;

        let link = format!(
            "{}/reset-password?token={}",
            state.app_config.referral.base_url.trim_end_matches('/'),
            token.token
        );
        notify_quietly(
            &state,
            &Recipient::Email(email.clone()),
            "Reset your TIC GLOBAL password",
            &format!("Use this link within 24 hours to reset your password: {}", link),
        )
        .await;
        tracing::info!("Password reset issued for {}", email);
    } else {
        tracing::debug!("Password reset requested for unknown account {}", email);
    }

    Ok(Json(ApiResponse::ok(MessageResponse::new(
        "If an account exists for this email, a reset link has been sent",
    ))))
}

/// Reset the password with a token
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "Auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<MessageResponse>),
        (status = 400, description = "Weak password, unknown or expired token")
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    const MISSING: &str = "Token and password are required";
    let token = required(req.token, MISSING)?;
    let password = required(req.password, MISSING)?;
    check_password(&password).map_err(ApiError::BadRequest)?;

    let record = state
        .verifications
        .get_reset_token(&token)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Invalid or expired reset token".into()))?;

    let now = state.clock.now();
    if now > record.expires_at {
        state.verifications.delete_reset_token(&token).await?;
        return Err(ApiError::BadRequest("Invalid or expired reset token".into()));
    }

    let password_hash = bcrypt::hash(&password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))?;
    let user = match state
        .users
        .update_user(&record.email, &UserUpdate::PasswordHash(password_hash), now)
        .await
    {
        Ok(user) => user,
        Err(StoreError::NotFound) => {
            return Err(ApiError::BadRequest("Invalid or expired reset token".into()));
        }
        Err(e) => return Err(e.into()),
    };
    state.verifications.delete_reset_token(&token).await?;

    tracing::info!("Password reset completed for {}", user.email);
    Ok(Json(ApiResponse::ok(MessageResponse::new("Password has been reset"))))
}

/// Current profile
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    security(("bearer_jwt" = [])),
    responses(
        (status = 200, description = "Authenticated profile", body = ApiResponse<UserResponse>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(CurrentUser(user): CurrentUser) -> Json<ApiResponse<UserResponse>> {
    Json(ApiResponse::ok(UserResponse::from(&user)))
}

/// Complete the KYC profile
#[utoipa::path(
    post,
    path = "/api/auth/complete-profile",
    tag = "Auth",
    security(("bearer_jwt" = [])),
    request_body = CompleteProfileRequest,
    responses(
        (status = 200, description = "Profile completed", body = ApiResponse<UserResponse>),
        (status = 400, description = "Missing field or invalid date of birth")
    )
)]
pub async fn complete_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CompleteProfileRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    const MISSING: &str = "All profile fields are required";
    let date_of_birth = required(req.date_of_birth, MISSING)?;
    let profile = ProfileDetails {
        first_name: required(req.first_name, MISSING)?,
        last_name: required(req.last_name, MISSING)?,
        date_of_birth: NaiveDate::parse_from_str(&date_of_birth, "%Y-%m-%d")
            .map_err(|_| ApiError::BadRequest("Invalid date of birth".into()))?,
        country_of_birth: required(req.country_of_birth, MISSING)?,
        gender: required(req.gender, MISSING)?,
        address: required(req.address, MISSING)?,
    };

    let user = state
        .users
        .update_user(&user.email, &UserUpdate::Profile(profile), state.clock.now())
        .await
        .map_err(user_not_found)?;

    tracing::info!("Profile completed for {}", user.email);
    Ok(Json(ApiResponse::ok(UserResponse::from(&user))))
}

/// Send a phone verification code
#[utoipa::path(
    post,
    path = "/api/auth/send-phone-code",
    tag = "Auth",
    security(("bearer_jwt" = [])),
    request_body = PhoneCodeRequest,
    responses(
        (status = 200, description = "Code sent", body = ApiResponse<MessageResponse>),
        (status = 400, description = "Missing or malformed phone number")
    )
)]
pub async fn send_phone_code(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<PhoneCodeRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let phone = normalize_phone(&required(req.phone, "Phone number is required")?)?;

    let now = state.clock.now();
    let code = VerificationCode {
        channel: VerificationChannel::Phone,
        target: phone.clone(),
        user_email: user.email.clone(),
        code: generate_code(),
        expires_at: code_expiry(now),
        created_at: now,
    };
    state.verifications.upsert_code(&code).await?;

    state
        .notifier
        .notify(
            &Recipient::Phone(phone.clone()),
            "TIC GLOBAL phone verification",
            &format!("Your TIC GLOBAL code is {}", code.code),
        )
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to send phone code: {}", e)))?;

    Ok(Json(ApiResponse::ok(MessageResponse::new("Verification code sent"))))
}

/// Verify a phone code
#[utoipa::path(
    post,
    path = "/api/auth/verify-phone-code",
    tag = "Auth",
    security(("bearer_jwt" = [])),
    request_body = PhoneCodeRequest,
    responses(
        (status = 200, description = "Phone verified", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid or expired code")
    )
)]
pub async fn verify_phone_code(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<PhoneCodeRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    const MISSING: &str = "Phone number and code are required";
    let phone = normalize_phone(&required(req.phone, MISSING)?)?;
    let submitted = required(req.code, MISSING)?;

    consume_code(&state, VerificationChannel::Phone, &phone, &user.email, &submitted).await?;

    let user = state
        .users
        .update_user(&user.email, &UserUpdate::PhoneVerified { phone }, state.clock.now())
        .await
        .map_err(user_not_found)?;

    tracing::info!("Phone verified for {}", user.email);
    Ok(Json(ApiResponse::ok(UserResponse::from(&user))))
}

/// `update_user` reports a missing account as a bare `NotFound`.
pub(crate) fn user_not_found(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound => ApiError::NotFound("User not found".into()),
        other => other.into(),
    }
}

/// Strips separators; accepts an optional leading `+` and 7 to 15 digits.
fn normalize_phone(raw: &str) -> Result<String, ApiError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();
    let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    if !(7..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::BadRequest("Invalid phone number".into()));
    }
    Ok(cleaned)
}

/// Submit identity documents for review
#[utoipa::path(
    post,
    path = "/api/auth/identity",
    tag = "Auth",
    security(("bearer_jwt" = [])),
    request_body = IdentitySubmissionRequest,
    responses(
        (status = 200, description = "Submission recorded, status pending", body = ApiResponse<UserResponse>),
        (status = 400, description = "Missing full name or country"),
        (status = 409, description = "Identity already verified")
    )
)]
pub async fn submit_identity(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<IdentitySubmissionRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    const MISSING: &str = "Full name and country are required";
    let full_name = required(req.full_name, MISSING)?;
    let country = required(req.country, MISSING)?;

    if user.identity_status == IdentityStatus::Verified {
        return Err(ApiError::Conflict("Identity already verified".into()));
    }

    let user = state
        .users
        .update_user(&user.email, &UserUpdate::IdentitySubmitted { country }, state.clock.now())
        .await
        .map_err(user_not_found)?;

    notify_quietly(
        &state,
        &Recipient::Admin,
        "Identity verification submitted",
        &format!("{} ({}) submitted identity documents", full_name, user.email),
    )
    .await;

    Ok(Json(ApiResponse::ok(UserResponse::from(&user))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+234 801-234-5678").unwrap(), "+2348012345678");
        assert_eq!(normalize_phone("(555) 123.4567").unwrap(), "5551234567");
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("+23480123456789012").is_err());
        assert!(normalize_phone("call me").is_err());
    }
}
