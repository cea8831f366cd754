//! # Referral routes

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};

use tic_core::commission::rules::{COMMISSION_PLAN_ID, VIP_UNILEVEL_DEPTH};
use tic_core::common::id::random_base36;
use tic_core::common::validate::normalize_email;
use tic_core::referral::code::{issue_code, register_referral as link_referral};
use tic_core::referral::entity::Referral;
use tic_core::user::entity::UserRole;

use crate::error::ApiError;
use crate::middleware::auth::CurrentUser;
use crate::routes::{optional, required};
use crate::server::AppState;
use crate::types::{ApiResponse, ReferralCodeResponse};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ValidateQuery {
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer_email: Option<String>,
}

/// Error envelope of the validate endpoint, which still reports `isValid`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidateErrorResponse {
    pub success: bool,
    pub data: ValidateResponse,
    pub error: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterReferralRequest {
    pub referral_code: Option<String>,
    pub new_user_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterReferralResponse {
    pub has_referrer: bool,
    pub referrer_email: String,
    pub referral_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferralStatsResponse {
    pub total_referrals: u64,
    pub active_referrals: u64,
    #[schema(value_type = String)]
    pub total_earnings: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferredUserResponse {
    pub email: String,
    pub referral_code: String,
    pub joined_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferralDataResponse {
    pub referral_code: String,
    pub referral_link: String,
    pub stats: ReferralStatsResponse,
    pub referrals: Vec<ReferredUserResponse>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct NetworkQuery {
    /// Only this depth (1 = direct referrals)
    pub level: Option<u32>,
    /// `vip`, `starter` or `none`
    pub plan_type: Option<String>,
    /// `active` or `inactive`
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkMemberResponse {
    pub email: String,
    pub level: u32,
    pub referrer_email: String,
    pub join_date: String,
    /// Best active plan held: `vip`, `starter` or `none`
    pub plan_type: String,
    /// `active` while the member holds an unexpired plan
    pub status: String,
    /// The member's own code, once issued
    pub referral_code: Option<String>,
    /// Commissions the caller earned from this member
    #[schema(value_type = String)]
    pub total_earnings: Decimal,
    pub referrals_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LevelCountResponse {
    pub level: u32,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkResponse {
    pub referrals: Vec<NetworkMemberResponse>,
    /// Whole network, before filters
    pub total_members: usize,
    pub active_members: usize,
    pub by_level: Vec<LevelCountResponse>,
}

impl From<Referral> for ReferredUserResponse {
    fn from(r: Referral) -> Self {
        Self {
            email: r.referred_email,
            referral_code: r.referral_code,
            joined_at: r.created_at.to_rfc3339(),
        }
    }
}

/// Check a referral code
///
/// Codes are matched case-insensitively.
#[utoipa::path(
    get,
    path = "/api/referrals/validate",
    tag = "Referrals",
    params(ValidateQuery),
    responses(
        (status = 200, description = "Validation result", body = ApiResponse<ValidateResponse>),
        (status = 400, description = "Missing code", body = ValidateErrorResponse)
    )
)]
pub async fn validate_code(
    State(state): State<AppState>,
    Query(query): Query<ValidateQuery>,
) -> Result<Response, ApiError> {
    let code = match query.code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => code.to_string(),
        _ => {
            let body = ValidateErrorResponse {
                success: false,
                data: ValidateResponse {
                    is_valid: false,
                    referrer_email: None,
                },
                error: "Referral code is required".into(),
            };
            return Ok((StatusCode::BAD_REQUEST, Json(body)).into_response());
        }
    };

    let found = state.referrals.find_code(&code).await?;
    let data = ValidateResponse {
        is_valid: found.is_some(),
        referrer_email: found.map(|c| c.user_email),
    };
    Ok(Json(ApiResponse::ok(data)).into_response())
}

/// Link a new user to a referrer
///
/// Callable by an admin, or by the new user for their own account.
#[utoipa::path(
    post,
    path = "/api/referrals/register",
    tag = "Referrals",
    security(("bearer_jwt" = [])),
    request_body = RegisterReferralRequest,
    responses(
        (status = 200, description = "Referral recorded", body = ApiResponse<RegisterReferralResponse>),
        (status = 400, description = "Invalid code, self referral or already referred"),
        (status = 403, description = "Caller may not register this user")
    )
)]
pub async fn register_referral(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Json(req): Json<RegisterReferralRequest>,
) -> Result<Json<ApiResponse<RegisterReferralResponse>>, ApiError> {
    const MISSING: &str = "Referral code and new user email are required";
    let code = required(req.referral_code, MISSING)?;
    let new_user = normalize_email(&required(req.new_user_email, MISSING)?);

    if caller.role != UserRole::Admin && caller.email != new_user {
        return Err(ApiError::Forbidden(
            "You can only register a referral for your own account".into(),
        ));
    }

    let referral = link_referral(state.referrals.as_ref(), &code, &new_user, state.clock.now()).await?;
    tracing::info!(
        "Referral recorded: {} referred {} with {}",
        referral.referrer_email,
        referral.referred_email,
        referral.referral_code
    );

    Ok(Json(ApiResponse::ok(RegisterReferralResponse {
        has_referrer: true,
        referrer_email: referral.referrer_email,
        referral_code: referral.referral_code,
    })))
}

/// Caller's referral code, statistics and referred users
#[utoipa::path(
    get,
    path = "/api/referrals/user-data",
    tag = "Referrals",
    security(("bearer_jwt" = [])),
    responses(
        (status = 200, description = "Referral dashboard", body = ApiResponse<ReferralDataResponse>)
    )
)]
pub async fn user_data(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<ReferralDataResponse>>, ApiError> {
    let code = issue_code(
        state.referrals.as_ref(),
        &user.email,
        &state.app_config.referral.base_url,
        state.clock.now(),
        || random_base36(4),
    )
    .await?;
    let stats = state.referrals.stats(&user.email).await?;
    let referrals = state.referrals.list_referrals(&user.email).await?;

    Ok(Json(ApiResponse::ok(ReferralDataResponse {
        referral_code: code.code,
        referral_link: code.link,
        stats: ReferralStatsResponse {
            total_referrals: stats.total_referrals,
            active_referrals: stats.active_referrals,
            total_earnings: stats.total_earnings,
        },
        referrals: referrals.into_iter().map(Into::into).collect(),
    })))
}

/// Get or create the caller's referral code
#[utoipa::path(
    post,
    path = "/api/referrals/generate",
    tag = "Referrals",
    security(("bearer_jwt" = [])),
    responses(
        (status = 200, description = "Referral code", body = ApiResponse<ReferralCodeResponse>)
    )
)]
pub async fn generate_code(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<ReferralCodeResponse>>, ApiError> {
    let code = issue_code(
        state.referrals.as_ref(),
        &user.email,
        &state.app_config.referral.base_url,
        state.clock.now(),
        || random_base36(4),
    )
    .await?;
    Ok(Json(ApiResponse::ok(ReferralCodeResponse::from(&code))))
}

/// Caller's referral network, down to 15 levels
#[utoipa::path(
    get,
    path = "/api/referrals/list",
    tag = "Referrals",
    security(("bearer_jwt" = [])),
    params(NetworkQuery),
    responses(
        (status = 200, description = "Network members by level", body = ApiResponse<NetworkResponse>)
    )
)]
pub async fn list_network(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<NetworkQuery>,
) -> Result<Json<ApiResponse<NetworkResponse>>, ApiError> {
    let now = state.clock.now();
    let members = state.commissions.downline(&user.email, VIP_UNILEVEL_DEPTH).await?;
    let earned = state.commissions.earnings_by_member(&user.email).await?;

    // Best plan per holder: vip outranks starter
    let mut plans: HashMap<String, String> = HashMap::new();
    for sub in state.distribution.active_subscriptions(now).await? {
        let held = plans.entry(sub.user_email).or_insert_with(|| sub.plan_id.clone());
        if sub.plan_id == COMMISSION_PLAN_ID {
            *held = sub.plan_id;
        }
    }

    let plan_filter = optional(query.plan_type).map(|p| p.to_lowercase());
    let status_filter = optional(query.status).map(|s| s.to_lowercase());

    let mut by_level: Vec<LevelCountResponse> = Vec::new();
    let mut active_members = 0;
    let mut referrals = Vec::new();
    for member in &members {
        match by_level.last_mut() {
            Some(bucket) if bucket.level == member.level => bucket.count += 1,
            _ => by_level.push(LevelCountResponse {
                level: member.level,
                count: 1,
            }),
        }

        let plan_type = plans
            .get(&member.email)
            .cloned()
            .unwrap_or_else(|| "none".to_string());
        let status = if plan_type == "none" { "inactive" } else { "active" };
        if status == "active" {
            active_members += 1;
        }

        if query.level.is_some_and(|l| l != member.level)
            || plan_filter.as_ref().is_some_and(|p| *p != plan_type)
            || status_filter.as_ref().is_some_and(|s| s != status)
        {
            continue;
        }

        let own_code = state.referrals.get_code_for_user(&member.email).await?;
        referrals.push(NetworkMemberResponse {
            email: member.email.clone(),
            level: member.level,
            referrer_email: member.referrer_email.clone(),
            join_date: member.joined_at.to_rfc3339(),
            plan_type,
            status: status.to_string(),
            total_earnings: earned.get(&member.email).copied().unwrap_or_default(),
            referrals_count: own_code.as_ref().map_or(0, |c| c.total_referrals),
            referral_code: own_code.map(|c| c.code),
        });
    }

    Ok(Json(ApiResponse::ok(NetworkResponse {
        referrals,
        total_members: members.len(),
        active_members,
        by_level,
    })))
}
