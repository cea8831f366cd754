//! # Subscription views
//!
//! What a user holds and what it has paid out so far.

use axum::Json;
use axum::extract::{Query, State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use tic_core::common::Page;
use tic_core::distribution::entity::DistributionRecord;

use crate::error::ApiError;
use crate::middleware::auth::CurrentUser;
use crate::routes::optional;
use crate::server::AppState;
use crate::types::{ApiResponse, Pagination, PaymentRecordResponse, SubscriptionResponse};

#[derive(Debug, Deserialize, IntoParams)]
pub struct PaymentPageQuery {
    /// Payment rows (default 20)
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatsResponse {
    pub total_payments: u64,
    #[schema(value_type = String)]
    pub total_spent: Decimal,
    pub active_subscriptions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSubscriptionsResponse {
    pub active_subscriptions: Vec<SubscriptionResponse>,
    pub all_subscriptions: Vec<SubscriptionResponse>,
    pub payments: Vec<PaymentRecordResponse>,
    pub stats: PaymentStatsResponse,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct DistributionHistoryQuery {
    pub plan_id: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DistributionRecordResponse {
    pub subscription_id: String,
    pub plan_id: String,
    pub plan_name: String,
    #[schema(example = "2026-03-01")]
    pub distribution_date: String,
    #[schema(value_type = String, example = "18.90410959")]
    pub token_amount: Decimal,
    pub created_at: String,
}

impl From<DistributionRecord> for DistributionRecordResponse {
    fn from(r: DistributionRecord) -> Self {
        Self {
            subscription_id: r.subscription_id,
            plan_id: r.plan_id,
            plan_name: r.plan_name,
            distribution_date: r.date.format("%Y-%m-%d").to_string(),
            token_amount: r.token_amount,
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DistributionHistorySummary {
    #[schema(value_type = String)]
    pub total_tokens: Decimal,
    pub total_distributions: u64,
    #[schema(value_type = String)]
    pub average_daily: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DistributionHistoryResponse {
    pub distributions: Vec<DistributionRecordResponse>,
    pub summary: DistributionHistorySummary,
    pub active_subscriptions: Vec<SubscriptionResponse>,
    pub pagination: Pagination,
}

/// Caller's subscriptions and plan payments
#[utoipa::path(
    get,
    path = "/api/user/subscriptions",
    tag = "Payments",
    security(("bearer_jwt" = [])),
    params(PaymentPageQuery),
    responses(
        (status = 200, description = "Subscriptions and payments", body = ApiResponse<UserSubscriptionsResponse>)
    )
)]
pub async fn user_subscriptions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PaymentPageQuery>,
) -> Result<Json<ApiResponse<UserSubscriptionsResponse>>, ApiError> {
    let now = state.clock.now();
    let page = Page::new(query.limit, query.offset, 20);

    let subscriptions = state.distribution.list_user_subscriptions(&user.email).await?;
    let (payments, has_more) = state.plans.list_payments(&user.email, page).await?;
    let stats = state.plans.payment_stats(&user.email).await?;

    let active: Vec<SubscriptionResponse> = subscriptions
        .iter()
        .filter(|s| s.is_active_at(now))
        .map(Into::into)
        .collect();

    Ok(Json(ApiResponse::ok(UserSubscriptionsResponse {
        stats: PaymentStatsResponse {
            total_payments: stats.total_payments,
            total_spent: stats.total_spent,
            active_subscriptions: active.len(),
        },
        active_subscriptions: active,
        all_subscriptions: subscriptions.iter().map(Into::into).collect(),
        payments: payments.into_iter().map(Into::into).collect(),
        pagination: Pagination {
            limit: page.limit,
            offset: page.offset,
            has_more,
        },
    })))
}

/// Caller's daily TIC credits, newest first
#[utoipa::path(
    get,
    path = "/api/distribution/history",
    tag = "Payments",
    security(("bearer_jwt" = [])),
    params(DistributionHistoryQuery),
    responses(
        (status = 200, description = "Distribution history", body = ApiResponse<DistributionHistoryResponse>)
    )
)]
pub async fn distribution_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<DistributionHistoryQuery>,
) -> Result<Json<ApiResponse<DistributionHistoryResponse>>, ApiError> {
    let now = state.clock.now();
    let plan_id = optional(query.plan_id).map(|p| p.to_lowercase());
    let page = Page::new(query.limit, query.offset, 50);

    let (rows, has_more) = state
        .distribution
        .list_user_distributions(&user.email, plan_id.as_deref(), page)
        .await?;
    let totals = state
        .distribution
        .user_distribution_totals(&user.email, plan_id.as_deref())
        .await?;
    let subscriptions = state.distribution.list_user_subscriptions(&user.email).await?;

    Ok(Json(ApiResponse::ok(DistributionHistoryResponse {
        distributions: rows.into_iter().map(Into::into).collect(),
        summary: DistributionHistorySummary {
            total_tokens: totals.total_tokens,
            total_distributions: totals.count,
            average_daily: totals.average().round_dp(8),
        },
        active_subscriptions: subscriptions
            .iter()
            .filter(|s| s.is_active_at(now))
            .map(Into::into)
            .collect(),
        pagination: Pagination {
            limit: page.limit,
            offset: page.offset,
            has_more,
        },
    })))
}
