//! # Authentication middleware
//!
//! JWT session handling and the admin gate.
//!
//! There is exactly one way to reach admin routes: a token whose account
//! has role `admin` and whose email is on the configured allow-list.
//! Request headers other than `Authorization` are never consulted.

use std::time::Duration;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use tic_core::cache::port::CacheExt;
use tic_core::common::id::new_id;
use tic_core::user::entity::{User, UserRole};

use crate::error::ApiError;
use crate::server::AppState;
use crate::types::Claims;

/// Extracts and verifies `Authorization: Bearer <token>`.
///
/// # Logic
/// 1. Signature and `exp` are checked against the configured secret.
/// 2. Revoked token ids are refused.
/// 3. The account must still exist; it is injected into the request
///    extensions together with the claims.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = match req.headers().get(axum::http::header::AUTHORIZATION) {
        Some(header_val) => {
            let s = header_val
                .to_str()
                .map_err(|_| ApiError::Unauthorized("Invalid auth header".into()))?;
            match s.strip_prefix("Bearer ") {
                Some(token) => token.trim().to_string(),
                None => {
                    tracing::warn!("Invalid Bearer format");
                    return Err(ApiError::Unauthorized("Invalid Bearer format".into()));
                }
            }
        }
        None => {
            tracing::warn!("Missing Authorization header on {}", req.uri().path());
            return Err(ApiError::Unauthorized("Missing Authorization header".into()));
        }
    };

    let claims = match verify_jwt(&token, &state.app_config.server.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("JWT verification failed: {}", e);
            return Err(e);
        }
    };

    if state.cache.contains(&revocation_key(&claims.jti)).await? {
        tracing::warn!("Revoked token presented by {}", claims.sub);
        return Err(ApiError::Unauthorized("Token has been revoked".into()));
    }

    let user = state
        .users
        .get_user(&claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    req.extensions_mut().insert(user);
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Admin gate. Must be layered inside `auth_middleware`.
///
/// # Invariants
/// - Requires the stored role, the token role and the allow-list to agree.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = req
        .extensions()
        .get::<User>()
        .ok_or_else(|| ApiError::Unauthorized("User context not found".into()))?;
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| ApiError::Unauthorized("Session context not found".into()))?;

    let is_admin = user.role == UserRole::Admin
        && claims.role == UserRole::Admin.to_string()
        && state.app_config.admin.is_allowed(&user.email);

    if !is_admin {
        tracing::warn!(
            "Admin access denied for {} on {}",
            user.email,
            req.uri().path()
        );
        return Err(ApiError::Forbidden("Admin privileges required".into()));
    }

    Ok(next.run(req).await)
}

/// Verifies a JWT and returns the typed claims.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::default();
    validation.set_required_spec_claims(&["exp", "sub"]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )
    .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))?;

    Ok(token_data.claims)
}

/// # Summary
/// Signs a session token for `user`.
///
/// # Arguments
/// * `ttl_secs` - lifetime; regular and admin sessions use different values.
///
/// # Returns
/// * The encoded token and its claims.
pub fn issue_token(
    user: &User,
    ttl_secs: u64,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<(String, Claims), ApiError> {
    let iat = u64::try_from(now.timestamp())
        .map_err(|_| ApiError::Internal("Clock is before the unix epoch".into()))?;
    let claims = Claims {
        sub: user.email.clone(),
        role: user.role.to_string(),
        jti: new_id(),
        iat,
        exp: iat.saturating_add(ttl_secs),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))?;

    Ok((token, claims))
}

/// Marks the token as unusable until it would have expired anyway.
pub async fn revoke_token(state: &AppState, claims: &Claims) -> Result<(), ApiError> {
    let now = u64::try_from(state.clock.now().timestamp()).unwrap_or(0);
    let remaining = claims.exp.saturating_sub(now).max(1);
    state
        .cache
        .set(
            &revocation_key(&claims.jti),
            &claims.sub,
            Some(Duration::from_secs(remaining)),
        )
        .await?;
    Ok(())
}

fn revocation_key(jti: &str) -> String {
    format!("revoked_jwt:{}", jti)
}

/// Authenticated account, injected by `auth_middleware`.
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<User>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Missing User Context".into()))?;
        Ok(CurrentUser(user))
    }
}

/// Claims of the presented token.
pub struct CurrentSession(pub Claims);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<Claims>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Missing Session Context".into()))?;
        Ok(CurrentSession(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_token_round_trips() {
        let now = Utc::now();
        let user = User::new("ops@example.com".into(), "h".into(), None, UserRole::Admin, now);
        let (token, claims) = issue_token(&user, 3600, "secret", now).unwrap();
        let decoded = verify_jwt(&token, "secret").unwrap();
        assert_eq!(decoded.sub, "ops@example.com");
        assert_eq!(decoded.role, "admin");
        assert_eq!(decoded.jti, claims.jti);
        assert_eq!(decoded.exp, claims.iat + 3600);
        assert!(verify_jwt(&token, "other-secret").is_err());
    }

    #[test]
    fn test_expired_token_is_refused() {
        let issued = Utc::now() - chrono::Duration::hours(2);
        let user = User::new("a@example.com".into(), "h".into(), None, UserRole::User, issued);
        let (token, _) = issue_token(&user, 60, "secret", issued).unwrap();
        assert!(matches!(verify_jwt(&token, "secret"), Err(ApiError::Unauthorized(_))));
    }
}
