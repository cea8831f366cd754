//! # Withdrawal routes (user side)
//!
//! The requested amount is held from the main balance as soon as the
//! request is created; cancelling or rejecting it refunds the hold.

use axum::Json;
use axum::extract::{Query, State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use tic_core::common::Page;
use tic_core::common::id::new_id;
use tic_core::funding::entity::Withdrawal;
use tic_core::notify::entity::Recipient;

use crate::error::ApiError;
use crate::middleware::auth::CurrentUser;
use crate::routes::{notify_quietly, required};
use crate::server::AppState;
use crate::types::{
    ApiResponse, PaymentMethodResponse, WalletResponse, WithdrawalResponse,
    WithdrawalStatsResponse,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct WithdrawalQuery {
    /// `methods` (default) or `history`
    #[serde(rename = "type")]
    pub view: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Either the payout methods or the caller's history, depending on `type`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WithdrawalOverview {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub methods: Option<Vec<PaymentMethodResponse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawals: Option<Vec<WithdrawalResponse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<WithdrawalStatsResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<WalletResponse>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateWithdrawalRequest {
    #[schema(example = "usdt-trc20")]
    pub method_id: Option<String>,
    pub destination_address: Option<String>,
    #[schema(value_type = Option<String>, example = "50.00")]
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelWithdrawalRequest {
    pub withdrawal_id: Option<String>,
}

/// Payout methods or withdrawal history
#[utoipa::path(
    get,
    path = "/api/withdrawals",
    tag = "Withdrawals",
    security(("bearer_jwt" = [])),
    params(WithdrawalQuery),
    responses(
        (status = 200, description = "Methods or history with statistics", body = ApiResponse<WithdrawalOverview>),
        (status = 400, description = "Unknown type")
    )
)]
pub async fn get_withdrawals(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<WithdrawalQuery>,
) -> Result<Json<ApiResponse<WithdrawalOverview>>, ApiError> {
    match query.view.as_deref().unwrap_or("methods") {
        "methods" => {
            let methods = state.funding.list_payment_methods(true).await?;
            Ok(Json(ApiResponse::ok(WithdrawalOverview {
                methods: Some(methods.into_iter().map(Into::into).collect()),
                withdrawals: None,
                stats: None,
                wallet: None,
            })))
        }
        "history" => {
            let page = Page::new(query.limit, query.offset, 20);
            let withdrawals = state.funding.list_user_withdrawals(&user.email, page).await?;
            let stats = state.funding.withdrawal_stats(&user.email).await?;
            let wallet = state.wallets.get_or_create_wallet(&user.email).await?;
            Ok(Json(ApiResponse::ok(WithdrawalOverview {
                methods: None,
                withdrawals: Some(withdrawals.into_iter().map(Into::into).collect()),
                stats: Some(stats.into()),
                wallet: Some(WalletResponse::from(&wallet)),
            })))
        }
        other => Err(ApiError::BadRequest(format!(
            "Invalid type '{}'. Must be methods or history",
            other
        ))),
    }
}

/// Request a withdrawal
///
/// Holds `amount` from the main balance and creates a pending request.
#[utoipa::path(
    post,
    path = "/api/withdrawals",
    tag = "Withdrawals",
    security(("bearer_jwt" = [])),
    request_body = CreateWithdrawalRequest,
    responses(
        (status = 200, description = "Withdrawal requested", body = ApiResponse<WithdrawalResponse>),
        (status = 400, description = "Invalid amount, inactive method or insufficient balance"),
        (status = 404, description = "Payment method not found")
    )
)]
pub async fn create_withdrawal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateWithdrawalRequest>,
) -> Result<Json<ApiResponse<WithdrawalResponse>>, ApiError> {
    const MISSING: &str = "Payment method, destination address and amount are required";
    let method_id = required(req.method_id, MISSING)?;
    let destination = required(req.destination_address, MISSING)?;
    let amount = req.amount.ok_or_else(|| ApiError::BadRequest(MISSING.into()))?;
    if amount <= Decimal::ZERO {
        return Err(ApiError::BadRequest("Amount must be greater than 0".into()));
    }

    let method = state
        .funding
        .get_payment_method(&method_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Payment method not found".into()))?;

    let withdrawal = Withdrawal::new_pending(
        new_id(),
        user.email.clone(),
        destination,
        amount,
        &method,
        state.clock.now(),
    )?;
    state.funding.create_withdrawal(&withdrawal).await?;

    tracing::info!(
        "Withdrawal {} requested by {}: {} {} to {}",
        withdrawal.id,
        user.email,
        withdrawal.amount,
        withdrawal.currency,
        withdrawal.destination_address
    );
    notify_quietly(
        &state,
        &Recipient::Admin,
        "New withdrawal request",
        &format!(
            "{} requested a withdrawal of {} {} ({} after fees) via {}. Withdrawal id: {}",
            user.email,
            withdrawal.amount,
            withdrawal.currency,
            withdrawal.final_amount,
            withdrawal.network,
            withdrawal.id
        ),
    )
    .await;

    Ok(Json(ApiResponse::ok(withdrawal.into())))
}

/// Cancel a pending withdrawal
///
/// Refunds the held amount to the main balance.
#[utoipa::path(
    put,
    path = "/api/withdrawals",
    tag = "Withdrawals",
    security(("bearer_jwt" = [])),
    request_body = CancelWithdrawalRequest,
    responses(
        (status = 200, description = "Withdrawal cancelled", body = ApiResponse<WithdrawalResponse>),
        (status = 404, description = "Withdrawal not found"),
        (status = 409, description = "Withdrawal is no longer pending")
    )
)]
pub async fn cancel_withdrawal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CancelWithdrawalRequest>,
) -> Result<Json<ApiResponse<WithdrawalResponse>>, ApiError> {
    let id = required(req.withdrawal_id, "Withdrawal id is required")?;
    let withdrawal = state
        .funding
        .cancel_withdrawal(&id, &user.email, state.clock.now())
        .await?;
    tracing::info!("Withdrawal {} cancelled by {}", id, user.email);
    Ok(Json(ApiResponse::ok(withdrawal.into())))
}
