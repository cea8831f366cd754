//! # Back-office routes
//!
//! Everything here except `admin_login` sits behind `auth_middleware` and
//! `require_admin`: the caller's stored role, token role and the configured
//! allow-list must all agree.

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use tic_core::common::Page;
use tic_core::common::id::new_id;
use tic_core::common::validate::normalize_email;
use tic_core::distribution::entity::{Subscription, SubscriptionStatus};
use tic_core::commission::service::run_unilevel_distribution;
use tic_core::distribution::service::run_daily_distribution;
use tic_core::funding::entity::{
    DepositFilter, DepositStatus, PaymentMethod, ReviewAction, ReviewDecision, WithdrawalAction,
    WithdrawalStatus,
};
use tic_core::notify::entity::{Notification, NotificationPriority, Recipient};
use tic_core::user::entity::{IdentityStatus, UserRole, UserUpdate};
use tic_core::wallet::pricing::daily_allocation;

use crate::error::ApiError;
use crate::middleware::auth::{CurrentSession, CurrentUser, issue_token, revoke_token};
use crate::routes::auth::{authenticate, user_not_found};
use crate::routes::{notify_quietly, optional, required};
use crate::server::AppState;
use crate::types::{
    ApiResponse, BulkItemError, BulkItemResult, BulkReviewResponse, DepositResponse,
    DepositStatsResponse, DistributionReportResponse, LoginRequest, LoginResponse,
    MessageResponse, NotificationResponse, Pagination, PaymentMethodResponse,
    SubscriptionResponse, UnilevelReportResponse, UserResponse, WithdrawalResponse,
};

const INVALID_ADMIN_CREDENTIALS: &str = "Invalid admin credentials";

// ============================================================
//  Request / response bodies
// ============================================================

/// Pending deposit or withdrawal in the review queue.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PendingTransactionResponse {
    /// `deposit` or `withdrawal`
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub user_email: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[schema(value_type = String)]
    pub final_amount: Decimal,
    pub currency: String,
    pub network: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PendingQueueQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PendingQueueResponse {
    pub transactions: Vec<PendingTransactionResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReviewTransactionRequest {
    pub id: Option<String>,
    /// `approve` or `reject`
    pub action: Option<String>,
    /// `deposit` or `withdrawal`
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ReviewedTransaction {
    Deposit(DepositResponse),
    Withdrawal(WithdrawalResponse),
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct DepositListQuery {
    pub status: Option<String>,
    pub network: Option<String>,
    /// Case-insensitive substring of the owner email
    pub user_email: Option<String>,
    /// RFC 3339 timestamp or `YYYY-MM-DD`
    pub date_from: Option<String>,
    /// RFC 3339 timestamp or `YYYY-MM-DD` (inclusive)
    pub date_to: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DepositListResponse {
    pub deposits: Vec<DepositResponse>,
    pub stats: DepositStatsResponse,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkReviewRequest {
    #[serde(default)]
    pub deposit_ids: Vec<String>,
    pub action: Option<String>,
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDepositStatusRequest {
    pub deposit_id: Option<String>,
    /// One of `pending`, `approved`, `rejected`, `completed`, `failed`
    pub status: Option<String>,
    pub admin_notes: Option<String>,
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DepositUpdateResponse {
    pub deposit: DepositResponse,
    /// `true` when this call credited the wallet
    pub credited: bool,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteDepositRequest {
    pub deposit_id: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReviewWithdrawalRequest {
    /// `approve`, `reject` or `complete`
    pub action: Option<String>,
    pub reason: Option<String>,
    pub tx_hash: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct UserListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct IdentityStatusRequest {
    /// `verified` or `rejected`
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodRequest {
    #[schema(example = "usdt-trc20")]
    pub id: Option<String>,
    pub name: Option<String>,
    #[schema(example = "TRC20")]
    pub network: Option<String>,
    /// Defaults to `USD`
    pub currency: Option<String>,
    pub deposit_address: Option<String>,
    #[schema(value_type = Option<String>)]
    pub min_amount: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub max_amount: Option<Decimal>,
    #[schema(value_type = Option<String>, example = "0.01")]
    pub processing_fee_rate: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub fixed_fee: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub network_fee: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub user_email: Option<String>,
    pub title: Option<String>,
    pub message: Option<String>,
    /// Defaults to `system`
    pub kind: Option<String>,
    /// `low`, `medium` (default) or `high`
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub user_email: Option<String>,
    /// `vip` or `starter`
    pub plan_id: Option<String>,
    pub plan_name: Option<String>,
    /// Defaults to 365
    pub duration_days: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DistributionStatusResponse {
    #[schema(example = "2026-03-01")]
    pub date: String,
    pub active_subscriptions: usize,
    pub distributions_today: u64,
    #[schema(value_type = String)]
    pub tokens_distributed_today: Decimal,
    pub already_distributed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnilevelStatusResponse {
    /// Commissions already stored for today
    pub today: UnilevelReportResponse,
    pub vip_holders: usize,
    pub referrers: usize,
    pub already_distributed: bool,
}

// ============================================================
//  Session
// ============================================================

/// Admin login
///
/// Only accounts with the `admin` role whose email is on the configured
/// allow-list can obtain an admin token.
#[utoipa::path(
    post,
    path = "/api/admin/login",
    tag = "Admin",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Admin token issued", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid admin credentials")
    )
)]
pub async fn admin_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    const MISSING: &str = "Email and password are required";
    let email = normalize_email(&required(req.email, MISSING)?);
    let password = required(req.password, MISSING)?;

    let user = authenticate(&state, &email, &password)
        .await
        .map_err(|_| ApiError::Unauthorized(INVALID_ADMIN_CREDENTIALS.into()))?;
    if user.role != UserRole::Admin || !state.app_config.admin.is_allowed(&user.email) {
        tracing::warn!("Refused admin login for {}", user.email);
        return Err(ApiError::Unauthorized(INVALID_ADMIN_CREDENTIALS.into()));
    }

    let ttl = state.app_config.admin.token_ttl_secs;
    let (token, _) = issue_token(&user, ttl, &state.app_config.server.jwt_secret, state.clock.now())?;
    tracing::info!("Admin {} logged in", user.email);

    Ok(Json(ApiResponse::ok(LoginResponse {
        token,
        expires_in: ttl,
        user: UserResponse::from(&user),
    })))
}

/// Admin logout
///
/// Revokes the presented token until it would have expired anyway.
#[utoipa::path(
    delete,
    path = "/api/admin/login",
    tag = "Admin",
    security(("bearer_jwt" = [])),
    responses(
        (status = 200, description = "Token revoked", body = ApiResponse<MessageResponse>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn admin_logout(
    State(state): State<AppState>,
    CurrentSession(claims): CurrentSession,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    revoke_token(&state, &claims).await?;
    tracing::info!("Admin {} logged out", claims.sub);
    Ok(Json(ApiResponse::ok(MessageResponse::new("Logged out"))))
}

// ============================================================
//  Review queue
// ============================================================

/// Pending deposits and withdrawals, newest first
#[utoipa::path(
    get,
    path = "/api/admin/transactions",
    tag = "Admin",
    security(("bearer_jwt" = [])),
    params(PendingQueueQuery),
    responses(
        (status = 200, description = "Review queue", body = ApiResponse<PendingQueueResponse>),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn list_pending_transactions(
    State(state): State<AppState>,
    Query(query): Query<PendingQueueQuery>,
) -> Result<Json<ApiResponse<PendingQueueResponse>>, ApiError> {
    let page = Page::new(query.limit, query.offset, 50);
    // Both sources are sorted by age, so the merged window comes from the
    // head of each; one extra row tells whether more follow.
    let window = Page {
        limit: page.offset.saturating_add(page.limit).saturating_add(1),
        offset: 0,
    };
    let filter = DepositFilter {
        status: Some(DepositStatus::Pending),
        page: window,
        ..Default::default()
    };
    let (deposits, _) = state.funding.list_deposits(&filter).await?;
    let withdrawals = state
        .funding
        .list_withdrawals(Some(WithdrawalStatus::Pending), window)
        .await?;

    let mut queue: Vec<(DateTime<Utc>, PendingTransactionResponse)> =
        Vec::with_capacity(deposits.len() + withdrawals.len());
    for d in deposits {
        queue.push((
            d.created_at,
            PendingTransactionResponse {
                kind: "deposit".into(),
                id: d.id,
                user_email: d.user_email,
                amount: d.amount,
                final_amount: d.final_amount,
                currency: d.currency,
                network: d.network,
                status: d.status.to_string(),
                created_at: d.created_at.to_rfc3339(),
            },
        ));
    }
    for w in withdrawals {
        queue.push((
            w.created_at,
            PendingTransactionResponse {
                kind: "withdrawal".into(),
                id: w.id,
                user_email: w.user_email,
                amount: w.amount,
                final_amount: w.final_amount,
                currency: w.currency,
                network: w.network,
                status: w.status.to_string(),
                created_at: w.created_at.to_rfc3339(),
            },
        ));
    }
    queue.sort_by(|a, b| b.0.cmp(&a.0));

    let skip = usize::try_from(page.offset).unwrap_or(usize::MAX);
    let take = usize::try_from(page.limit).unwrap_or(usize::MAX);
    let has_more = queue.len() > skip.saturating_add(take);

    Ok(Json(ApiResponse::ok(PendingQueueResponse {
        transactions: queue.into_iter().skip(skip).take(take).map(|(_, item)| item).collect(),
        pagination: Pagination {
            limit: page.limit,
            offset: page.offset,
            has_more,
        },
    })))
}

/// Approve or reject one queued deposit or withdrawal
#[utoipa::path(
    post,
    path = "/api/admin/transactions",
    tag = "Admin",
    security(("bearer_jwt" = [])),
    request_body = ReviewTransactionRequest,
    responses(
        (status = 200, description = "Request reviewed", body = ApiResponse<ReviewedTransaction>),
        (status = 400, description = "Invalid action or type"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request is no longer pending")
    )
)]
pub async fn review_transaction(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Json(req): Json<ReviewTransactionRequest>,
) -> Result<Json<ApiResponse<ReviewedTransaction>>, ApiError> {
    const MISSING: &str = "id, action and type are required";
    let id = required(req.id, MISSING)?;
    let action: ReviewAction = required(req.action, MISSING)?
        .parse()
        .map_err(ApiError::BadRequest)?;
    let kind = required(req.kind, MISSING)?;

    let decision = ReviewDecision {
        action,
        admin_email: admin.email.clone(),
        notes: optional(req.notes),
        transaction_hash: None,
    };
    let now = state.clock.now();

    let reviewed = match kind.as_str() {
        "deposit" => {
            let deposit = state.funding.review_deposit(&id, &decision, now).await?;
            ReviewedTransaction::Deposit(deposit.into())
        }
        "withdrawal" => {
            let withdrawal = state.funding.review_withdrawal(&id, &decision, now).await?;
            ReviewedTransaction::Withdrawal(withdrawal.into())
        }
        _ => {
            return Err(ApiError::BadRequest(
                "Invalid type. Must be deposit or withdrawal".into(),
            ));
        }
    };

    tracing::info!("Admin {} reviewed {} {}: {:?}", admin.email, kind, id, action);
    Ok(Json(ApiResponse::ok(reviewed)))
}

// ============================================================
//  Deposits
// ============================================================

/// Parses an RFC 3339 timestamp or a bare date. Bare dates resolve to the
/// start of the day, or to its last millisecond when `end_of_day` is set.
fn parse_date_bound(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid date: {}", raw)))?;
    let start = date.and_time(NaiveTime::MIN).and_utc();
    Ok(if end_of_day {
        start + Duration::days(1) - Duration::milliseconds(1)
    } else {
        start
    })
}

/// Filtered deposit list with global statistics
#[utoipa::path(
    get,
    path = "/api/admin/deposits",
    tag = "Admin",
    security(("bearer_jwt" = [])),
    params(DepositListQuery),
    responses(
        (status = 200, description = "Deposits, stats and pagination", body = ApiResponse<DepositListResponse>),
        (status = 400, description = "Invalid status or date")
    )
)]
pub async fn list_deposits(
    State(state): State<AppState>,
    Query(query): Query<DepositListQuery>,
) -> Result<Json<ApiResponse<DepositListResponse>>, ApiError> {
    let status = optional(query.status)
        .filter(|s| s != "all")
        .map(|s| s.parse::<DepositStatus>())
        .transpose()
        .map_err(ApiError::BadRequest)?;
    let date_from = optional(query.date_from)
        .map(|raw| parse_date_bound(&raw, false))
        .transpose()?;
    let date_to = optional(query.date_to)
        .map(|raw| parse_date_bound(&raw, true))
        .transpose()?;

    let filter = DepositFilter {
        status,
        network: optional(query.network),
        user_email: optional(query.user_email),
        date_from,
        date_to,
        page: Page::new(query.limit, query.offset, 50),
    };
    let (deposits, has_more) = state.funding.list_deposits(&filter).await?;

    let day_start = state.clock.now().date_naive().and_time(NaiveTime::MIN).and_utc();
    let stats = state.funding.deposit_stats(day_start).await?;

    Ok(Json(ApiResponse::ok(DepositListResponse {
        deposits: deposits.into_iter().map(Into::into).collect(),
        stats: stats.into(),
        pagination: Pagination {
            limit: filter.page.limit,
            offset: filter.page.offset,
            has_more,
        },
    })))
}

/// Approve or reject several pending deposits
///
/// Each id is processed independently; failures are reported per id.
#[utoipa::path(
    post,
    path = "/api/admin/deposits",
    tag = "Admin",
    security(("bearer_jwt" = [])),
    request_body = BulkReviewRequest,
    responses(
        (status = 200, description = "Per-deposit results", body = ApiResponse<BulkReviewResponse>),
        (status = 400, description = "No ids or invalid action")
    )
)]
pub async fn bulk_review_deposits(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Json(req): Json<BulkReviewRequest>,
) -> Result<Json<ApiResponse<BulkReviewResponse>>, ApiError> {
    if req.deposit_ids.is_empty() {
        return Err(ApiError::BadRequest("depositIds must not be empty".into()));
    }
    let action: ReviewAction = required(req.action, "Action is required")?
        .parse()
        .map_err(ApiError::BadRequest)?;
    let decision = ReviewDecision {
        action,
        admin_email: admin.email.clone(),
        notes: optional(req.admin_notes),
        transaction_hash: None,
    };

    let now = state.clock.now();
    let mut results = Vec::new();
    let mut errors = Vec::new();
    for id in &req.deposit_ids {
        match state.funding.review_deposit(id, &decision, now).await {
            Ok(deposit) => results.push(BulkItemResult {
                id: id.clone(),
                status: deposit.status.to_string(),
            }),
            Err(e) => {
                tracing::warn!("Bulk review of deposit {} failed: {}", id, e);
                errors.push(BulkItemError {
                    id: id.clone(),
                    error: ApiError::from(e).public_message(),
                });
            }
        }
    }

    let verb = match action {
        ReviewAction::Approve => "approved",
        ReviewAction::Reject => "rejected",
    };
    notify_quietly(
        &state,
        &Recipient::Admin,
        "Bulk deposit review",
        &format!(
            "{} {} {} deposit(s); {} failed.",
            admin.email,
            verb,
            results.len(),
            errors.len()
        ),
    )
    .await;

    Ok(Json(ApiResponse::ok(BulkReviewResponse {
        processed: results.len(),
        results,
        errors,
    })))
}

/// Set a deposit's status directly
///
/// Moving into `approved` or `completed` credits the wallet once; repeated
/// calls never credit twice.
#[utoipa::path(
    put,
    path = "/api/admin/deposits",
    tag = "Admin",
    security(("bearer_jwt" = [])),
    request_body = UpdateDepositStatusRequest,
    responses(
        (status = 200, description = "Deposit updated", body = ApiResponse<DepositUpdateResponse>),
        (status = 400, description = "Invalid status"),
        (status = 404, description = "Deposit not found"),
        (status = 409, description = "Credited deposit cannot move back")
    )
)]
pub async fn update_deposit_status(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Json(req): Json<UpdateDepositStatusRequest>,
) -> Result<Json<ApiResponse<DepositUpdateResponse>>, ApiError> {
    const MISSING: &str = "depositId and status are required";
    let id = required(req.deposit_id, MISSING)?;
    let status: DepositStatus = required(req.status, MISSING)?
        .parse()
        .map_err(ApiError::BadRequest)?;

    let update = state
        .funding
        .set_deposit_status(
            &id,
            status,
            &admin.email,
            optional(req.admin_notes),
            optional(req.transaction_hash),
            state.clock.now(),
        )
        .await?;

    Ok(Json(ApiResponse::ok(DepositUpdateResponse {
        deposit: update.deposit.into(),
        credited: update.credited,
    })))
}

/// Delete a deposit that never credited the wallet
#[utoipa::path(
    delete,
    path = "/api/admin/deposits",
    tag = "Admin",
    security(("bearer_jwt" = [])),
    request_body = DeleteDepositRequest,
    responses(
        (status = 200, description = "Deposit deleted", body = ApiResponse<DepositResponse>),
        (status = 404, description = "Deposit not found"),
        (status = 409, description = "Deposit already credited")
    )
)]
pub async fn delete_deposit(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Json(req): Json<DeleteDepositRequest>,
) -> Result<Json<ApiResponse<DepositResponse>>, ApiError> {
    const MISSING: &str = "depositId and reason are required";
    let id = required(req.deposit_id, MISSING)?;
    let reason = required(req.reason, MISSING)?;

    let deposit = state.funding.delete_deposit(&id).await?;
    tracing::info!("Admin {} deleted deposit {}: {}", admin.email, id, reason);
    Ok(Json(ApiResponse::ok(deposit.into())))
}

// ============================================================
//  Withdrawals
// ============================================================

/// Review or complete a withdrawal
///
/// `approve` / `reject` act on a pending request; rejection refunds the held
/// amount. `complete` marks an approved request as paid out.
#[utoipa::path(
    patch,
    path = "/api/admin/withdrawals/{id}",
    tag = "Admin",
    security(("bearer_jwt" = [])),
    params(("id" = String, Path, description = "Withdrawal id")),
    request_body = ReviewWithdrawalRequest,
    responses(
        (status = 200, description = "Withdrawal updated", body = ApiResponse<WithdrawalResponse>),
        (status = 400, description = "Invalid action"),
        (status = 404, description = "Withdrawal not found"),
        (status = 409, description = "Withdrawal is not in a state that allows the action")
    )
)]
pub async fn review_withdrawal(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<ReviewWithdrawalRequest>,
) -> Result<Json<ApiResponse<WithdrawalResponse>>, ApiError> {
    let action: WithdrawalAction = required(req.action, "Action is required")?
        .parse()
        .map_err(ApiError::BadRequest)?;
    let now = state.clock.now();

    let withdrawal = match action {
        WithdrawalAction::Review(action) => {
            let decision = ReviewDecision {
                action,
                admin_email: admin.email.clone(),
                notes: optional(req.reason),
                transaction_hash: optional(req.tx_hash),
            };
            state.funding.review_withdrawal(&id, &decision, now).await?
        }
        WithdrawalAction::Complete => {
            state
                .funding
                .complete_withdrawal(&id, &admin.email, optional(req.tx_hash), now)
                .await?
        }
    };
    tracing::info!("Admin {} set withdrawal {} to {}", admin.email, id, withdrawal.status);
    Ok(Json(ApiResponse::ok(withdrawal.into())))
}

// ============================================================
//  Users & configuration
// ============================================================

/// List accounts, newest first
#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    security(("bearer_jwt" = [])),
    params(UserListQuery),
    responses(
        (status = 200, description = "Users", body = ApiResponse<UserListResponse>)
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<ApiResponse<UserListResponse>>, ApiError> {
    let page = Page::new(query.limit, query.offset, 50);
    let users = state.users.list_users(page).await?;
    let has_more = users.len() >= usize::try_from(page.limit).unwrap_or(usize::MAX);

    Ok(Json(ApiResponse::ok(UserListResponse {
        users: users.iter().map(UserResponse::from).collect(),
        pagination: Pagination {
            limit: page.limit,
            offset: page.offset,
            has_more,
        },
    })))
}

/// Record the KYC review outcome
#[utoipa::path(
    patch,
    path = "/api/admin/users/{email}/identity",
    tag = "Admin",
    security(("bearer_jwt" = [])),
    params(("email" = String, Path, description = "Account email")),
    request_body = IdentityStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<UserResponse>),
        (status = 400, description = "Status must be verified or rejected"),
        (status = 404, description = "User not found")
    )
)]
pub async fn set_identity_status(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(email): Path<String>,
    Json(req): Json<IdentityStatusRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let status: IdentityStatus = required(req.status, "Status is required")?
        .parse()
        .map_err(ApiError::BadRequest)?;
    if !matches!(status, IdentityStatus::Verified | IdentityStatus::Rejected) {
        return Err(ApiError::BadRequest(
            "Status must be verified or rejected".into(),
        ));
    }

    let email = normalize_email(&email);
    let now = state.clock.now();
    let user = state
        .users
        .update_user(&email, &UserUpdate::IdentityReviewed(status), now)
        .await
        .map_err(user_not_found)?;

    let inbox = Notification::new(
        new_id(),
        user.email.clone(),
        "Identity verification",
        format!("Your identity verification was {}.", status),
        "kyc",
        NotificationPriority::High,
        now,
    );
    if let Err(e) = state.notifications.create_notification(&inbox).await {
        tracing::warn!("Failed to record KYC notification for {}: {}", user.email, e);
    }

    tracing::info!("Admin {} set identity of {} to {}", admin.email, user.email, status);
    Ok(Json(ApiResponse::ok(UserResponse::from(&user))))
}

/// Create or replace a payment method
#[utoipa::path(
    post,
    path = "/api/admin/payment-methods",
    tag = "Admin",
    security(("bearer_jwt" = [])),
    request_body = PaymentMethodRequest,
    responses(
        (status = 200, description = "Payment method saved", body = ApiResponse<PaymentMethodResponse>),
        (status = 400, description = "Missing fields, negative fees or min above max")
    )
)]
pub async fn save_payment_method(
    State(state): State<AppState>,
    Json(req): Json<PaymentMethodRequest>,
) -> Result<Json<ApiResponse<PaymentMethodResponse>>, ApiError> {
    const MISSING: &str = "id, name, network, minAmount and maxAmount are required";
    let min_amount = req.min_amount.ok_or_else(|| ApiError::BadRequest(MISSING.into()))?;
    let max_amount = req.max_amount.ok_or_else(|| ApiError::BadRequest(MISSING.into()))?;
    let method = PaymentMethod {
        id: required(req.id, MISSING)?,
        name: required(req.name, MISSING)?,
        network: required(req.network, MISSING)?,
        currency: optional(req.currency).unwrap_or_else(|| "USD".into()),
        deposit_address: optional(req.deposit_address),
        min_amount,
        max_amount,
        processing_fee_rate: req.processing_fee_rate.unwrap_or(Decimal::ZERO),
        fixed_fee: req.fixed_fee.unwrap_or(Decimal::ZERO),
        network_fee: req.network_fee.unwrap_or(Decimal::ZERO),
        is_active: req.is_active.unwrap_or(true),
    };

    if method.min_amount < Decimal::ZERO || method.min_amount > method.max_amount {
        return Err(ApiError::BadRequest(
            "minAmount must be non-negative and not above maxAmount".into(),
        ));
    }
    if method.processing_fee_rate < Decimal::ZERO
        || method.fixed_fee < Decimal::ZERO
        || method.network_fee < Decimal::ZERO
    {
        return Err(ApiError::BadRequest("Fees cannot be negative".into()));
    }

    state.funding.save_payment_method(&method).await?;
    tracing::info!("Saved payment method {} ({})", method.id, method.network);
    Ok(Json(ApiResponse::ok(method.into())))
}

/// Send an in-app notification to a user
#[utoipa::path(
    post,
    path = "/api/admin/notifications",
    tag = "Admin",
    security(("bearer_jwt" = [])),
    request_body = CreateNotificationRequest,
    responses(
        (status = 200, description = "Notification created", body = ApiResponse<NotificationResponse>),
        (status = 400, description = "Missing fields or invalid priority"),
        (status = 404, description = "User not found")
    )
)]
pub async fn create_notification(
    State(state): State<AppState>,
    Json(req): Json<CreateNotificationRequest>,
) -> Result<Json<ApiResponse<NotificationResponse>>, ApiError> {
    const MISSING: &str = "userEmail, title and message are required";
    let email = normalize_email(&required(req.user_email, MISSING)?);
    let title = required(req.title, MISSING)?;
    let message = required(req.message, MISSING)?;
    let priority = optional(req.priority)
        .map(|p| p.parse::<NotificationPriority>())
        .transpose()
        .map_err(ApiError::BadRequest)?
        .unwrap_or(NotificationPriority::Medium);

    if state.users.get_user(&email).await?.is_none() {
        return Err(ApiError::NotFound("User not found".into()));
    }

    let notification = Notification::new(
        new_id(),
        email,
        title,
        message,
        optional(req.kind).unwrap_or_else(|| "system".into()),
        priority,
        state.clock.now(),
    );
    state.notifications.create_notification(&notification).await?;
    Ok(Json(ApiResponse::ok(notification.into())))
}

// ============================================================
//  Subscriptions & daily distribution
// ============================================================

/// Grant a subscription plan to a user
#[utoipa::path(
    post,
    path = "/api/admin/subscriptions",
    tag = "Admin",
    security(("bearer_jwt" = [])),
    request_body = CreateSubscriptionRequest,
    responses(
        (status = 200, description = "Subscription created", body = ApiResponse<SubscriptionResponse>),
        (status = 400, description = "Unknown plan or invalid duration"),
        (status = 404, description = "User not found")
    )
)]
pub async fn create_subscription(
    State(state): State<AppState>,
    Json(req): Json<CreateSubscriptionRequest>,
) -> Result<Json<ApiResponse<SubscriptionResponse>>, ApiError> {
    const MISSING: &str = "userEmail and planId are required";
    let email = normalize_email(&required(req.user_email, MISSING)?);
    let plan_id = required(req.plan_id, MISSING)?.to_lowercase();
    let plan = state
        .plans
        .get_plan(&plan_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Invalid plan. Must be vip or starter".into()))?;
    let days = req.duration_days.unwrap_or(365);
    if days == 0 {
        return Err(ApiError::BadRequest("durationDays must be greater than 0".into()));
    }

    if state.users.get_user(&email).await?.is_none() {
        return Err(ApiError::NotFound("User not found".into()));
    }

    let now = state.clock.now();
    let subscription = Subscription {
        id: new_id(),
        user_email: email,
        plan_name: optional(req.plan_name).unwrap_or(plan.name),
        plan_id,
        status: SubscriptionStatus::Active,
        start_date: now,
        end_date: now + Duration::days(i64::from(days)),
        created_at: now,
    };
    state.distribution.create_subscription(&subscription).await?;

    tracing::info!(
        "Subscription {} ({}) created for {}, {} TIC/day",
        subscription.id,
        subscription.plan_id,
        subscription.user_email,
        daily_allocation(&subscription.plan_id)
    );
    Ok(Json(ApiResponse::ok(SubscriptionResponse::from(&subscription))))
}

/// Today's distribution status
#[utoipa::path(
    get,
    path = "/api/admin/distribute-daily-tic",
    tag = "Admin",
    security(("bearer_jwt" = [])),
    responses(
        (status = 200, description = "Distribution status", body = ApiResponse<DistributionStatusResponse>)
    )
)]
pub async fn distribution_status(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DistributionStatusResponse>>, ApiError> {
    let now = state.clock.now();
    let summary = state.distribution.day_summary(now.date_naive()).await?;
    let active = state.distribution.active_subscriptions(now).await?;

    Ok(Json(ApiResponse::ok(DistributionStatusResponse {
        date: summary.date.to_string(),
        active_subscriptions: active.len(),
        distributions_today: summary.distributions,
        tokens_distributed_today: summary.total_tokens,
        already_distributed: summary.distributions > 0,
    })))
}

/// Run today's TIC distribution
///
/// Safe to repeat: subscriptions already credited today are skipped.
#[utoipa::path(
    post,
    path = "/api/admin/distribute-daily-tic",
    tag = "Admin",
    security(("bearer_jwt" = [])),
    responses(
        (status = 200, description = "Distribution report", body = ApiResponse<DistributionReportResponse>)
    )
)]
pub async fn distribute_daily_tic(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
) -> Result<Json<ApiResponse<DistributionReportResponse>>, ApiError> {
    let report = run_daily_distribution(state.distribution.as_ref(), state.clock.now()).await?;

    notify_quietly(
        &state,
        &Recipient::Admin,
        "Daily TIC distribution",
        &format!(
            "Run by {} for {}: {} distributed, {} skipped, {} errors, {} TIC total.",
            admin.email,
            report.date,
            report.distributed,
            report.skipped,
            report.errors,
            report.total_tokens_distributed
        ),
    )
    .await;

    Ok(Json(ApiResponse::ok(report.into())))
}

/// Today's unilevel commission status
#[utoipa::path(
    get,
    path = "/api/admin/unilevel-commissions/distribute",
    tag = "Admin",
    security(("bearer_jwt" = [])),
    responses(
        (status = 200, description = "Unilevel status", body = ApiResponse<UnilevelStatusResponse>)
    )
)]
pub async fn unilevel_status(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<UnilevelStatusResponse>>, ApiError> {
    let now = state.clock.now();
    let today = state.commissions.day_report(now.date_naive()).await?;
    let holders = state.commissions.active_vip_counts(now).await?;
    let referrers = state.commissions.referrers().await?;

    Ok(Json(ApiResponse::ok(UnilevelStatusResponse {
        already_distributed: today.credited > 0,
        today: today.into(),
        vip_holders: holders.len(),
        referrers: referrers.len(),
    })))
}

/// Run today's unilevel commissions
///
/// Safe to repeat: commissions already paid today are skipped.
#[utoipa::path(
    post,
    path = "/api/admin/unilevel-commissions/distribute",
    tag = "Admin",
    security(("bearer_jwt" = [])),
    responses(
        (status = 200, description = "Unilevel report", body = ApiResponse<UnilevelReportResponse>)
    )
)]
pub async fn distribute_unilevel(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
) -> Result<Json<ApiResponse<UnilevelReportResponse>>, ApiError> {
    let report = run_unilevel_distribution(state.commissions.as_ref(), state.clock.now()).await?;

    notify_quietly(
        &state,
        &Recipient::Admin,
        "Unilevel commissions",
        &format!(
            "Run by {} for {}: {} credited, {} skipped, {} errors, ${} total.",
            admin.email,
            report.date,
            report.credited,
            report.skipped,
            report.errors,
            report.total_amount
        ),
    )
    .await;

    Ok(Json(ApiResponse::ok(report.into())))
}
