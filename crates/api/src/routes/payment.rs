//! # Plan catalogue & purchases

use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use tic_core::notify::entity::Recipient;

use crate::error::ApiError;
use crate::middleware::auth::CurrentUser;
use crate::routes::{notify_quietly, optional, required};
use crate::server::AppState;
use crate::types::{
    ApiResponse, PaymentPlanResponse, PaymentRecordResponse, SubscriptionResponse, WalletResponse,
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct PlanQuery {
    /// Only this plan
    pub plan_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlansResponse {
    pub plans: Vec<PaymentPlanResponse>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    #[schema(example = "vip")]
    pub plan_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub payment: PaymentRecordResponse,
    pub subscription: SubscriptionResponse,
    pub wallet: WalletResponse,
    /// Upline commissions paid on this purchase
    pub commissions_paid: usize,
}

/// Active plans, or a single plan when `planId` is given
#[utoipa::path(
    get,
    path = "/api/payments",
    tag = "Payments",
    security(("bearer_jwt" = [])),
    params(PlanQuery),
    responses(
        (status = 200, description = "Plan catalogue", body = ApiResponse<PlansResponse>),
        (status = 404, description = "Unknown or inactive plan")
    )
)]
pub async fn list_plans(
    State(state): State<AppState>,
    Query(query): Query<PlanQuery>,
) -> Result<Json<ApiResponse<PlansResponse>>, ApiError> {
    let plans = match optional(query.plan_id) {
        Some(id) => {
            let plan = state
                .plans
                .get_plan(&id.to_lowercase())
                .await?
                .filter(|p| p.is_active)
                .ok_or_else(|| ApiError::NotFound("Payment plan not found".into()))?;
            vec![plan]
        }
        None => state.plans.list_plans(true).await?,
    };
    Ok(Json(ApiResponse::ok(PlansResponse {
        plans: plans.iter().map(Into::into).collect(),
    })))
}

/// Buy a plan with the main balance
///
/// Opens the subscription right away; VIP purchases also pay the buyer's
/// two nearest referrers.
#[utoipa::path(
    post,
    path = "/api/payments",
    tag = "Payments",
    security(("bearer_jwt" = [])),
    request_body = PurchaseRequest,
    responses(
        (status = 200, description = "Plan purchased", body = ApiResponse<PurchaseResponse>),
        (status = 400, description = "Missing plan or insufficient balance"),
        (status = 404, description = "Unknown or inactive plan")
    )
)]
pub async fn purchase_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<PurchaseRequest>,
) -> Result<Json<ApiResponse<PurchaseResponse>>, ApiError> {
    let plan_id = required(req.plan_id, "Plan ID is required")?.to_lowercase();
    let purchase = state
        .plans
        .purchase(&user.email, &plan_id, state.clock.now())
        .await?;

    for commission in &purchase.commissions {
        notify_quietly(
            &state,
            &Recipient::Email(commission.earner_email.clone()),
            "Commission earned",
            &format!(
                "You earned ${} (level {}) from {}'s plan purchase.",
                commission.amount, commission.level, commission.referred_email
            ),
        )
        .await;
    }
    notify_quietly(
        &state,
        &Recipient::Admin,
        "Plan purchased",
        &format!(
            "{} bought {} for ${}.",
            user.email, purchase.payment.plan_name, purchase.payment.amount
        ),
    )
    .await;

    Ok(Json(ApiResponse::ok(PurchaseResponse {
        subscription: SubscriptionResponse::from(&purchase.subscription),
        wallet: WalletResponse::from(&purchase.wallet),
        commissions_paid: purchase.commissions.len(),
        payment: purchase.payment.into(),
    })))
}
