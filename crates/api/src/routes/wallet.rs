//! # Wallet routes
//!
//! Balance queries, the caller's ledger, internal transfers between slots,
//! peer-to-peer transfers and the admin balance adjustment.

use axum::Json;
use axum::extract::{Query, State};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::IntoParams;

use tic_core::common::id::transaction_id;
use tic_core::common::validate::normalize_email;
use tic_core::notify::entity::{Notification, NotificationPriority};
use tic_core::wallet::entity::{BalanceChange, Posting, TransactionKind, WalletAccount};
use tic_core::wallet::transfer::{plan_adjustment, plan_internal_transfer};

use crate::error::ApiError;
use crate::middleware::auth::CurrentUser;
use crate::routes::{optional, required};
use crate::server::AppState;
use crate::types::{
    ApiResponse, TransactionResponse, TransferBetweenAccountsRequest, TransferResponse,
    TransferToUserRequest, UpdateBalanceRequest, UserTransferResponse, WalletResponse,
};

const DEFAULT_TRANSACTION_LIMIT: u32 = 10;
const MAX_TRANSACTION_LIMIT: u32 = 100;

#[derive(Debug, Deserialize, IntoParams)]
pub struct TransactionQuery {
    /// Number of rows (default 10, max 100)
    pub limit: Option<u32>,
}

/// Caller's wallet
///
/// Creates an empty wallet on first access.
#[utoipa::path(
    get,
    path = "/api/wallet/balance",
    tag = "Wallet",
    security(("bearer_jwt" = [])),
    responses(
        (status = 200, description = "Wallet balances", body = ApiResponse<WalletResponse>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_balance(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<WalletResponse>>, ApiError> {
    let wallet = state.wallets.get_or_create_wallet(&user.email).await?;
    Ok(Json(ApiResponse::ok(WalletResponse::from(&wallet))))
}

/// Caller's ledger, newest first
#[utoipa::path(
    get,
    path = "/api/wallet/transactions",
    tag = "Wallet",
    security(("bearer_jwt" = [])),
    params(TransactionQuery),
    responses(
        (status = 200, description = "Ledger rows", body = ApiResponse<Vec<TransactionResponse>>)
    )
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<ApiResponse<Vec<TransactionResponse>>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_TRANSACTION_LIMIT)
        .clamp(1, MAX_TRANSACTION_LIMIT);
    let rows = state.wallets.list_transactions(&user.email, limit).await?;
    Ok(Json(ApiResponse::ok(rows.into_iter().map(Into::into).collect())))
}

/// Move funds between two slots of the caller's wallet
///
/// `amount` is in USD; token slots are converted at the fixed prices.
#[utoipa::path(
    post,
    path = "/api/wallet/transfer-between-accounts",
    tag = "Wallet",
    security(("bearer_jwt" = [])),
    request_body = TransferBetweenAccountsRequest,
    responses(
        (status = 200, description = "Transfer posted", body = ApiResponse<TransferResponse>),
        (status = 400, description = "Invalid route, amount or insufficient balance")
    )
)]
pub async fn transfer_between_accounts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<TransferBetweenAccountsRequest>,
) -> Result<Json<ApiResponse<TransferResponse>>, ApiError> {
    const MISSING: &str = "from_account, to_account and amount are required";
    let from: WalletAccount = required(req.from_account, MISSING)?
        .parse()
        .map_err(ApiError::BadRequest)?;
    let to: WalletAccount = required(req.to_account, MISSING)?
        .parse()
        .map_err(ApiError::BadRequest)?;
    let amount = req.amount.ok_or_else(|| ApiError::BadRequest(MISSING.into()))?;

    let plan = plan_internal_transfer(from, to, amount)?;

    let now = state.clock.now();
    let transfer_id = transaction_id(now.timestamp_millis());
    let description = optional(req.description)
        .unwrap_or_else(|| format!("Transfer from {} to {}", from, to));
    let posting = Posting::new(
        user.email.clone(),
        transfer_id.clone(),
        TransactionKind::InternalTransfer,
        description,
    )
    .with_change(plan.debit)
    .with_change(plan.credit)
    .with_metadata(serde_json::json!({
        "from_account": from.to_string(),
        "to_account": to.to_string(),
        "usd_amount": plan.usd_amount.to_string(),
    }));

    let outcome = state.wallets.post(&[posting]).await?;
    let wallet = outcome
        .wallets
        .first()
        .ok_or_else(|| ApiError::Internal("Posting returned no wallet".into()))?;

    tracing::info!(
        "{} moved {} USD from {} to {} ({})",
        user.email,
        plan.usd_amount,
        from,
        to,
        transfer_id
    );

    Ok(Json(ApiResponse::ok(TransferResponse {
        transfer_id,
        usd_amount: plan.usd_amount,
        debited: -plan.debit.delta,
        credited: plan.credit.delta,
        wallet: WalletResponse::from(wallet),
    })))
}

/// Send funds from the caller's main balance to another user
#[utoipa::path(
    post,
    path = "/api/wallet/transfer-to-user",
    tag = "Wallet",
    security(("bearer_jwt" = [])),
    request_body = TransferToUserRequest,
    responses(
        (status = 200, description = "Transfer posted", body = ApiResponse<UserTransferResponse>),
        (status = 400, description = "Invalid amount, self transfer or insufficient balance"),
        (status = 404, description = "Recipient not found")
    )
)]
pub async fn transfer_to_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<TransferToUserRequest>,
) -> Result<Json<ApiResponse<UserTransferResponse>>, ApiError> {
    const MISSING: &str = "recipient_email and amount are required";
    let recipient = normalize_email(&required(req.recipient_email, MISSING)?);
    let amount = req.amount.ok_or_else(|| ApiError::BadRequest(MISSING.into()))?;
    let fee = req.fee.unwrap_or(Decimal::ZERO);

    if amount <= Decimal::ZERO {
        return Err(ApiError::BadRequest("Transfer amount must be greater than 0".into()));
    }
    if fee < Decimal::ZERO {
        return Err(ApiError::BadRequest("Fee cannot be negative".into()));
    }
    if recipient == user.email {
        return Err(ApiError::BadRequest("Cannot transfer to yourself".into()));
    }
    if state.users.get_user(&recipient).await?.is_none() {
        return Err(ApiError::NotFound("Recipient not found".into()));
    }

    let now = state.clock.now();
    let transfer_id = transaction_id(now.timestamp_millis());
    let note = optional(req.description);
    let metadata = serde_json::json!({
        "sender": user.email,
        "recipient": recipient,
        "fee": fee.to_string(),
    });

    let outgoing = Posting::new(
        user.email.clone(),
        transfer_id.clone(),
        TransactionKind::TransferOut,
        note.clone()
            .unwrap_or_else(|| format!("Transfer to {}", recipient)),
    )
    .with_change(BalanceChange::debit(WalletAccount::Total, amount + fee))
    .with_reference(recipient.clone())
    .with_metadata(metadata.clone());

    let incoming = Posting::new(
        recipient.clone(),
        transfer_id.clone(),
        TransactionKind::TransferIn,
        note.unwrap_or_else(|| format!("Transfer from {}", user.email)),
    )
    .with_change(BalanceChange::credit(WalletAccount::Total, amount))
    .with_reference(user.email.clone())
    .with_metadata(metadata);

    let outcome = state.wallets.post(&[outgoing, incoming]).await?;
    let wallet = outcome
        .wallets
        .first()
        .ok_or_else(|| ApiError::Internal("Posting returned no wallet".into()))?;

    let inbox = Notification::new(
        tic_core::common::id::new_id(),
        recipient.clone(),
        "Funds received",
        format!("You received {} USD from {}", amount, user.email),
        "transfer",
        NotificationPriority::Medium,
        now,
    );
    if let Err(e) = state.notifications.create_notification(&inbox).await {
        tracing::warn!("Failed to record transfer notification for {}: {}", recipient, e);
    }

    tracing::info!("{} sent {} USD to {} ({})", user.email, amount, recipient, transfer_id);

    Ok(Json(ApiResponse::ok(UserTransferResponse {
        transfer_id,
        recipient_email: recipient,
        amount,
        fee,
        wallet: WalletResponse::from(wallet),
    })))
}

/// Adjust a user's balances (admin)
///
/// Every update is a signed delta; one `adjustment` ledger row is written
/// per changed slot.
#[utoipa::path(
    post,
    path = "/api/wallet/update-balance",
    tag = "Admin",
    security(("bearer_jwt" = [])),
    request_body = UpdateBalanceRequest,
    responses(
        (status = 200, description = "Balances adjusted", body = ApiResponse<WalletResponse>),
        (status = 400, description = "No updates or a slot would go negative"),
        (status = 403, description = "Admin privileges required"),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn update_balance(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Json(req): Json<UpdateBalanceRequest>,
) -> Result<Json<ApiResponse<WalletResponse>>, ApiError> {
    let email = normalize_email(&required(req.email, "Email is required")?);
    let wallet = state
        .wallets
        .get_wallet(&email)
        .await?
        .ok_or_else(|| ApiError::NotFound("Wallet not found".into()))?;

    let updates: Vec<(WalletAccount, Decimal)> = [
        (WalletAccount::Total, req.updates.total),
        (WalletAccount::Tic, req.updates.tic),
        (WalletAccount::Gic, req.updates.gic),
        (WalletAccount::Staking, req.updates.staking),
        (WalletAccount::Partner, req.updates.partner),
    ]
    .into_iter()
    .filter_map(|(account, delta)| delta.map(|d| (account, d)))
    .collect();

    let changes = plan_adjustment(&wallet, &updates)?;

    let now = state.clock.now();
    let mut posting = Posting::new(
        email.clone(),
        transaction_id(now.timestamp_millis()),
        TransactionKind::Adjustment,
        optional(req.description).unwrap_or_else(|| "Admin balance adjustment".into()),
    )
    .with_metadata(serde_json::json!({ "admin": admin.email }));
    for change in changes {
        posting = posting.with_change(change);
    }

    let outcome = state.wallets.post(&[posting]).await?;
    let wallet = outcome
        .wallets
        .first()
        .ok_or_else(|| ApiError::Internal("Posting returned no wallet".into()))?;

    tracing::info!("Admin {} adjusted balances of {}", admin.email, email);
    Ok(Json(ApiResponse::ok(WalletResponse::from(wallet))))
}
