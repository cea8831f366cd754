//! # API error handling
//!
//! Maps the error types of the lower crates onto HTTP status codes and the
//! JSON error envelope.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use tic_core::cache::error::CacheError;
use tic_core::funding::error::FundingError;
use tic_core::plan::error::PlanError;
use tic_core::referral::error::ReferralError;
use tic_core::store::error::StoreError;
use tic_core::user::registration::RegistrationError;
use tic_core::wallet::error::WalletError;

use crate::types::ApiErrorResponse;

/// API-level error enum.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Authentication failed (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient privileges (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request parameters (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// State transition not allowed (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Lower-layer failure (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Text shown to clients; internal details are replaced by a generic
    /// message.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg) => msg.clone(),
            ApiError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(msg) => {
                // Details stay in the log
                tracing::error!("Internal server error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ApiErrorResponse::from_msg(self.public_message()));
        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound("Record not found".into()),
            StoreError::Duplicate(msg) => {
                // The driver message names tables and columns
                tracing::warn!("Unique constraint hit: {}", msg);
                ApiError::Conflict("Resource already exists".into())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::NotFound(_) => ApiError::NotFound("Wallet not found".into()),
            WalletError::InsufficientBalance { account, .. } => {
                ApiError::BadRequest(format!("Insufficient {} balance", account))
            }
            WalletError::InvalidAmount(msg) | WalletError::InvalidTransfer(msg) => {
                ApiError::BadRequest(msg)
            }
            WalletError::Storage(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<FundingError> for ApiError {
    fn from(err: FundingError) -> Self {
        match err {
            FundingError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            e @ FundingError::InvalidState { .. } => ApiError::Conflict(e.to_string()),
            FundingError::Validation(msg) => ApiError::BadRequest(msg),
            FundingError::Wallet(e) => e.into(),
            FundingError::Storage(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<PlanError> for ApiError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::NotFound | PlanError::Inactive(_) => {
                ApiError::NotFound("Payment plan not found".into())
            }
            PlanError::Wallet(e) => e.into(),
            PlanError::Storage(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<ReferralError> for ApiError {
    fn from(err: ReferralError) -> Self {
        match err {
            ReferralError::Store(e) => e.into(),
            e @ ReferralError::GenerationExhausted(_) => ApiError::Internal(e.to_string()),
            e => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match err {
            e @ RegistrationError::EmailTaken => ApiError::BadRequest(e.to_string()),
            RegistrationError::Referral(e) => e.into(),
            RegistrationError::Store(e) => e.into(),
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use tic_core::wallet::entity::WalletAccount;

    fn status_of(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_domain_errors_map_to_status_codes() {
        assert_eq!(status_of(StoreError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(StoreError::Database("disk I/O".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(FundingError::InvalidState {
                kind: "Deposit",
                id: "d1".into(),
                status: "approved".into(),
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(FundingError::Wallet(WalletError::InsufficientBalance {
                account: WalletAccount::Total,
                required: Decimal::ONE,
                available: Decimal::ZERO,
            })),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(ReferralError::SelfReferral), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(PlanError::Inactive("vip".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(PlanError::Wallet(WalletError::InsufficientBalance {
                account: WalletAccount::Total,
                required: Decimal::TEN,
                available: Decimal::ONE,
            })),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ReferralError::GenerationExhausted(10)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_storage_details_stay_out_of_client_messages() {
        let err: ApiError =
            StoreError::Duplicate("UNIQUE constraint failed: users.email".into()).into();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(err.public_message(), "Resource already exists");

        let err: ApiError = FundingError::Storage("database is locked".into()).into();
        assert_eq!(err.public_message(), "Internal server error");

        let err: ApiError = RegistrationError::EmailTaken.into();
        assert_eq!(err.public_message(), "User already exists");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_insufficient_balance_message_names_account() {
        let err: ApiError = WalletError::InsufficientBalance {
            account: WalletAccount::Tic,
            required: Decimal::TEN,
            available: Decimal::ONE,
        }
        .into();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Insufficient tic balance"));
    }
}
