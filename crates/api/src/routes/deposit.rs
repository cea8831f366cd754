//! # Deposit routes (user side)

use axum::Json;
use axum::extract::{Query, State};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use tic_core::common::Page;
use tic_core::common::id::new_id;
use tic_core::funding::entity::Deposit;
use tic_core::notify::entity::Recipient;

use crate::error::ApiError;
use crate::middleware::auth::CurrentUser;
use crate::routes::{notify_quietly, optional, required};
use crate::server::AppState;
use crate::types::{ApiResponse, DepositResponse};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDepositRequest {
    #[schema(value_type = Option<String>, example = "100.00")]
    pub amount: Option<Decimal>,
    #[schema(example = "usdt-trc20")]
    pub method_id: Option<String>,
    /// On-chain hash, when the user already sent the funds
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Create a deposit request
///
/// Fees and currency come from the payment method. The request stays
/// `pending` until an admin reviews it.
#[utoipa::path(
    post,
    path = "/api/deposits/create",
    tag = "Deposits",
    security(("bearer_jwt" = [])),
    request_body = CreateDepositRequest,
    responses(
        (status = 200, description = "Deposit request created", body = ApiResponse<DepositResponse>),
        (status = 400, description = "Missing fields, inactive method or amount out of range"),
        (status = 404, description = "Payment method not found")
    )
)]
pub async fn create_deposit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateDepositRequest>,
) -> Result<Json<ApiResponse<DepositResponse>>, ApiError> {
    const MISSING: &str = "Amount and payment method are required";
    let amount = req.amount.ok_or_else(|| ApiError::BadRequest(MISSING.into()))?;
    let method_id = required(req.method_id, MISSING)?;

    let method = state
        .funding
        .get_payment_method(&method_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Payment method not found".into()))?;

    let mut deposit = Deposit::new_pending(
        new_id(),
        user.email.clone(),
        amount,
        &method,
        state.clock.now(),
    )?;
    deposit.transaction_hash = optional(req.transaction_hash);
    state.funding.create_deposit(&deposit).await?;

    tracing::info!(
        "Deposit {} created by {}: {} {} via {}",
        deposit.id,
        user.email,
        deposit.amount,
        deposit.currency,
        deposit.network
    );
    notify_quietly(
        &state,
        &Recipient::Admin,
        "New deposit request",
        &format!(
            "{} requested a deposit of {} {} via {} ({}). Deposit id: {}",
            user.email, deposit.amount, deposit.currency, deposit.method_name, deposit.network, deposit.id
        ),
    )
    .await;

    Ok(Json(ApiResponse::ok(deposit.into())))
}

/// Caller's deposit requests, newest first
#[utoipa::path(
    get,
    path = "/api/deposits",
    tag = "Deposits",
    security(("bearer_jwt" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Deposit requests", body = ApiResponse<Vec<DepositResponse>>)
    )
)]
pub async fn list_deposits(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<DepositResponse>>>, ApiError> {
    let page = Page::new(query.limit, query.offset, 20);
    let deposits = state.funding.list_user_deposits(&user.email, page).await?;
    Ok(Json(ApiResponse::ok(deposits.into_iter().map(Into::into).collect())))
}
