//! # Partner wallet
//!
//! Commission earnings land in the `partner` slot of the wallet; from there
//! they can only move to the main balance.

use axum::Json;
use axum::extract::{Query, State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use tic_core::commission::entity::{CommissionFilter, CommissionKind, CommissionSummary};
use tic_core::common::Page;
use tic_core::common::id::transaction_id;
use tic_core::wallet::entity::{Posting, TransactionKind, WalletAccount};
use tic_core::wallet::transfer::plan_internal_transfer;

use crate::error::ApiError;
use crate::middleware::auth::CurrentUser;
use crate::routes::optional;
use crate::server::AppState;
use crate::types::{ApiResponse, CommissionResponse, Pagination, WalletResponse};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartnerBalanceResponse {
    #[schema(value_type = String, example = "12.50")]
    pub partner_wallet_balance: Decimal,
    /// Lifetime commissions
    #[schema(value_type = String)]
    pub total_earned: Decimal,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CommissionQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// `plan_purchase` or `unilevel_daily`
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommissionSummaryResponse {
    #[schema(value_type = String)]
    pub total_earned: Decimal,
    pub total_count: u64,
    #[schema(value_type = String)]
    pub purchase_earned: Decimal,
    #[schema(value_type = String)]
    pub daily_earned: Decimal,
}

impl From<CommissionSummary> for CommissionSummaryResponse {
    fn from(s: CommissionSummary) -> Self {
        Self {
            total_earned: s.total_earned,
            total_count: s.total_count,
            purchase_earned: s.purchase_earned,
            daily_earned: s.daily_earned,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommissionHistoryResponse {
    pub commissions: Vec<CommissionResponse>,
    pub summary: CommissionSummaryResponse,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PartnerTransferRequest {
    /// USD moved to the main balance
    #[schema(value_type = Option<String>, example = "10")]
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartnerTransferResponse {
    pub transfer_id: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub wallet: WalletResponse,
}

/// Partner wallet balance and lifetime commissions
#[utoipa::path(
    get,
    path = "/api/partner-wallet/balance",
    tag = "Partner Wallet",
    security(("bearer_jwt" = [])),
    responses(
        (status = 200, description = "Partner balance", body = ApiResponse<PartnerBalanceResponse>)
    )
)]
pub async fn get_partner_balance(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<PartnerBalanceResponse>>, ApiError> {
    let wallet = state.wallets.get_or_create_wallet(&user.email).await?;
    let summary = state.commissions.summary(&user.email).await?;
    Ok(Json(ApiResponse::ok(PartnerBalanceResponse {
        partner_wallet_balance: wallet.partner_wallet_balance,
        total_earned: summary.total_earned,
    })))
}

/// Caller's commission history, newest first
#[utoipa::path(
    get,
    path = "/api/partner-wallet/commissions",
    tag = "Partner Wallet",
    security(("bearer_jwt" = [])),
    params(CommissionQuery),
    responses(
        (status = 200, description = "Commission history", body = ApiResponse<CommissionHistoryResponse>),
        (status = 400, description = "Unknown commission type")
    )
)]
pub async fn list_commissions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<CommissionQuery>,
) -> Result<Json<ApiResponse<CommissionHistoryResponse>>, ApiError> {
    let filter = CommissionFilter {
        kind: optional(query.kind)
            .map(|k| k.parse::<CommissionKind>())
            .transpose()
            .map_err(ApiError::BadRequest)?,
        ..Default::default()
    };
    let page = Page::new(query.limit, query.offset, 50);

    let (rows, has_more) = state
        .commissions
        .list_commissions(&user.email, &filter, page)
        .await?;
    let summary = state.commissions.summary(&user.email).await?;

    Ok(Json(ApiResponse::ok(CommissionHistoryResponse {
        commissions: rows.into_iter().map(Into::into).collect(),
        summary: summary.into(),
        pagination: Pagination {
            limit: page.limit,
            offset: page.offset,
            has_more,
        },
    })))
}

/// Move commissions to the main balance
#[utoipa::path(
    post,
    path = "/api/partner-wallet/transfer",
    tag = "Partner Wallet",
    security(("bearer_jwt" = [])),
    request_body = PartnerTransferRequest,
    responses(
        (status = 200, description = "Transfer posted", body = ApiResponse<PartnerTransferResponse>),
        (status = 400, description = "Invalid amount or insufficient partner balance")
    )
)]
pub async fn transfer_to_main(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<PartnerTransferRequest>,
) -> Result<Json<ApiResponse<PartnerTransferResponse>>, ApiError> {
    let amount = req
        .amount
        .ok_or_else(|| ApiError::BadRequest("Amount is required".into()))?;
    let plan = plan_internal_transfer(WalletAccount::Partner, WalletAccount::Total, amount)?;

    let now = state.clock.now();
    let transfer_id = transaction_id(now.timestamp_millis());
    let posting = Posting::new(
        user.email.clone(),
        transfer_id.clone(),
        TransactionKind::InternalTransfer,
        "Partner wallet to main balance",
    )
    .with_change(plan.debit)
    .with_change(plan.credit)
    .with_metadata(serde_json::json!({
        "from_account": WalletAccount::Partner.to_string(),
        "to_account": WalletAccount::Total.to_string(),
        "usd_amount": plan.usd_amount.to_string(),
    }));

    let outcome = state.wallets.post(&[posting]).await?;
    let wallet = outcome
        .wallets
        .first()
        .ok_or_else(|| ApiError::Internal("Posting returned no wallet".into()))?;

    tracing::info!(
        "{} moved {} USD from partner wallet to main balance ({})",
        user.email,
        plan.usd_amount,
        transfer_id
    );
    Ok(Json(ApiResponse::ok(PartnerTransferResponse {
        transfer_id,
        amount: plan.usd_amount,
        wallet: WalletResponse::from(wallet),
    })))
}
