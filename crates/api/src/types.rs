//! # DTO (Data Transfer Object) layer
//!
//! Lightweight structs that turn domain models into the JSON the front-end
//! consumes. Every DTO derives `utoipa::ToSchema` so it lands in Swagger.
//!
//! Request bodies keep every field optional: a missing field is reported as
//! a 400 by the handler instead of an extractor rejection.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use tic_core::commission::entity::{CommissionEarning, LevelTotal, UnilevelReport};
use tic_core::common::validate::EmailInspection;
use tic_core::distribution::entity::{DistributionItem, DistributionReport, Subscription};
use tic_core::funding::entity::{
    Deposit, DepositStats, PaymentMethod, Withdrawal, WithdrawalStats,
};
use tic_core::notify::entity::Notification;
use tic_core::plan::entity::{PaymentPlan, PaymentRecord};
use tic_core::referral::entity::ReferralCode;
use tic_core::user::entity::User;
use tic_core::wallet::entity::{Wallet, WalletTransaction};

// ============================================================
//  Envelope
// ============================================================

/// Uniform response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T: Serialize + ToSchema> {
    pub success: bool,
    /// Payload (on success)
    pub data: Option<T>,
    /// Error message (on failure)
    pub error: Option<String>,
}

impl<T: Serialize + ToSchema> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Failure body without payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Always false
    pub success: bool,
    pub error: String,
}

impl ApiErrorResponse {
    pub fn from_msg(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: msg.into(),
        }
    }
}

/// Plain confirmation message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Verification code sent")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================
//  Auth
// ============================================================

/// JWT claims (internal, not exposed in Swagger).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Normalized account email
    pub sub: String,
    /// "user" or "admin"
    pub role: String,
    /// Token id, used for revocation
    pub jti: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[schema(example = "jane@example.com")]
    pub email: Option<String>,
    #[schema(example = "Passw0rd!")]
    pub password: Option<String>,
    #[schema(example = "NG")]
    pub country: Option<String>,
    /// Referral code of the inviting user
    #[schema(example = "JOHA1B24321")]
    pub referral_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user: UserResponse,
    pub referral_code: String,
    pub referral_link: String,
    /// Email of the referrer, when a valid code was used
    pub referred_by: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "jane@example.com")]
    pub email: Option<String>,
    #[schema(example = "Passw0rd!")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// JWT Bearer token
    #[schema(example = "eyJhbGciOiJIUzI1NiIs...")]
    pub token: String,
    /// Token lifetime (seconds)
    #[schema(example = 604800)]
    pub expires_in: u64,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct EmailRequest {
    #[schema(example = "jane@example.com")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct VerifyCodeRequest {
    pub email: Option<String>,
    #[schema(example = "123456")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PhoneCodeRequest {
    #[schema(example = "+2348012345678")]
    pub phone: Option<String>,
    /// Only used by `verify-phone-code`
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// `YYYY-MM-DD`
    #[schema(example = "1990-04-12")]
    pub date_of_birth: Option<String>,
    pub country_of_birth: Option<String>,
    pub gender: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySubmissionRequest {
    pub full_name: Option<String>,
    pub country: Option<String>,
}

/// Result of the sign-up email checker.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailCheckResponse {
    pub is_valid: bool,
    pub is_disposable: bool,
    pub is_known_provider: bool,
    pub domain: Option<String>,
    pub reason: Option<String>,
}

impl From<EmailInspection> for EmailCheckResponse {
    fn from(i: EmailInspection) -> Self {
        Self {
            is_valid: i.is_valid,
            is_disposable: i.is_disposable,
            is_known_provider: i.is_known_provider,
            domain: i.domain,
            reason: i.reason,
        }
    }
}

/// Account profile.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = "jane@example.com")]
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[schema(example = "1990-04-12")]
    pub date_of_birth: Option<String>,
    pub country: Option<String>,
    pub country_of_birth: Option<String>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email_verified: bool,
    pub phone_verified: bool,
    #[schema(example = "not_submitted")]
    pub identity_verification_status: String,
    pub profile_completed: bool,
    #[schema(example = "user")]
    pub role: String,
    #[schema(example = "2026-03-01T00:00:00Z")]
    pub created_at: String,
}

// ============================================================
//  Wallet
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletResponse {
    pub user_email: String,
    /// Main USD balance
    #[schema(value_type = String, example = "1250.00")]
    pub total_balance: Decimal,
    /// TIC tokens
    #[schema(value_type = String, example = "500")]
    pub tic_balance: Decimal,
    /// GIC tokens
    #[schema(value_type = String, example = "1.5")]
    pub gic_balance: Decimal,
    #[schema(value_type = String, example = "0")]
    pub staking_balance: Decimal,
    #[schema(value_type = String, example = "0")]
    pub partner_wallet_balance: Decimal,
    pub updated_at: String,
}

/// Ledger row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    #[schema(example = "deposit_6f1c...")]
    pub transaction_id: String,
    #[schema(example = "deposit")]
    pub kind: String,
    #[schema(example = "total")]
    pub account: String,
    /// Signed amount
    #[schema(value_type = String, example = "97.50")]
    pub amount: Decimal,
    #[schema(value_type = String)]
    pub balance_before: Decimal,
    #[schema(value_type = String)]
    pub balance_after: Decimal,
    pub description: String,
    pub reference_id: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TransferBetweenAccountsRequest {
    #[schema(example = "total")]
    pub from_account: Option<String>,
    #[schema(example = "tic")]
    pub to_account: Option<String>,
    /// USD value to move
    #[schema(value_type = Option<String>, example = "10.00")]
    pub amount: Option<Decimal>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferResponse {
    pub transfer_id: String,
    #[schema(value_type = String)]
    pub usd_amount: Decimal,
    /// Units taken from the source slot
    #[schema(value_type = String)]
    pub debited: Decimal,
    /// Units added to the destination slot
    #[schema(value_type = String)]
    pub credited: Decimal,
    pub wallet: WalletResponse,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TransferToUserRequest {
    pub recipient_email: Option<String>,
    #[schema(value_type = Option<String>, example = "25.00")]
    pub amount: Option<Decimal>,
    #[schema(value_type = Option<String>, example = "0.50")]
    pub fee: Option<Decimal>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserTransferResponse {
    pub transfer_id: String,
    pub recipient_email: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[schema(value_type = String)]
    pub fee: Decimal,
    pub wallet: WalletResponse,
}

/// Signed deltas per slot; missing slots are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BalanceUpdates {
    #[schema(value_type = Option<String>)]
    pub total: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub tic: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub gic: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub staking: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub partner: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateBalanceRequest {
    pub email: Option<String>,
    #[serde(default)]
    pub updates: BalanceUpdates,
    pub description: Option<String>,
}

// ============================================================
//  Payment methods, deposits, withdrawals
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentMethodResponse {
    #[schema(example = "usdt-trc20")]
    pub id: String,
    #[schema(example = "USDT")]
    pub name: String,
    #[schema(example = "TRC20")]
    pub network: String,
    pub currency: String,
    pub deposit_address: Option<String>,
    #[schema(value_type = String)]
    pub min_amount: Decimal,
    #[schema(value_type = String)]
    pub max_amount: Decimal,
    #[schema(value_type = String, example = "0.01")]
    pub processing_fee_rate: Decimal,
    #[schema(value_type = String)]
    pub fixed_fee: Decimal,
    #[schema(value_type = String)]
    pub network_fee: Decimal,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DepositResponse {
    pub id: String,
    pub user_email: String,
    #[schema(value_type = String, example = "100.00")]
    pub amount: Decimal,
    pub currency: String,
    pub method_id: String,
    pub method_name: String,
    pub network: String,
    pub deposit_address: Option<String>,
    pub transaction_hash: Option<String>,
    #[schema(value_type = String)]
    pub processing_fee: Decimal,
    #[schema(value_type = String)]
    pub network_fee: Decimal,
    /// Amount credited on approval
    #[schema(value_type = String, example = "97.50")]
    pub final_amount: Decimal,
    #[schema(example = "pending")]
    pub status: String,
    pub admin_notes: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<String>,
    pub rejected_by: Option<String>,
    pub rejected_at: Option<String>,
    pub expires_at: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WithdrawalResponse {
    pub id: String,
    pub user_email: String,
    pub method_id: String,
    pub method_name: String,
    pub network: String,
    pub destination_address: String,
    /// Amount held from the wallet
    #[schema(value_type = String, example = "50.00")]
    pub amount: Decimal,
    pub currency: String,
    #[schema(value_type = String)]
    pub processing_fee: Decimal,
    #[schema(value_type = String)]
    pub network_fee: Decimal,
    /// Amount paid out
    #[schema(value_type = String, example = "48.00")]
    pub final_amount: Decimal,
    #[schema(example = "pending")]
    pub status: String,
    pub admin_notes: Option<String>,
    pub transaction_hash: Option<String>,
    pub processed_by: Option<String>,
    pub processed_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DepositStatsResponse {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    #[schema(value_type = String)]
    pub pending_amount: Decimal,
    pub deposits_today: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WithdrawalStatsResponse {
    pub total: u64,
    pub pending: u64,
    pub completed: u64,
    #[schema(value_type = String)]
    pub total_withdrawn: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
    pub has_more: bool,
}

/// Outcome of a bulk review.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkReviewResponse {
    pub processed: usize,
    pub results: Vec<BulkItemResult>,
    pub errors: Vec<BulkItemError>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkItemResult {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkItemError {
    pub id: String,
    pub error: String,
}

// ============================================================
//  Referrals
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferralCodeResponse {
    #[schema(example = "JOHA1B24321")]
    pub code: String,
    #[schema(example = "https://ticgloballtd.com/join?ref=JOHA1B24321")]
    pub link: String,
    pub created_at: String,
}

// ============================================================
//  Notifications
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationResponse {
    pub id: String,
    pub user_email: String,
    pub title: String,
    pub message: String,
    #[schema(example = "deposit")]
    pub kind: String,
    #[schema(example = "medium")]
    pub priority: String,
    pub is_read: bool,
    pub created_at: String,
}

// ============================================================
//  Subscriptions & distribution
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionResponse {
    pub id: String,
    pub user_email: String,
    #[schema(example = "vip")]
    pub plan_id: String,
    pub plan_name: String,
    pub status: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DistributionItemResponse {
    pub subscription_id: String,
    pub user_email: String,
    pub plan_id: String,
    #[schema(example = "distributed")]
    pub status: String,
    #[schema(value_type = String)]
    pub token_amount: Decimal,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DistributionReportResponse {
    #[schema(example = "2026-03-01")]
    pub date: String,
    pub total_subscriptions: usize,
    pub distributed: usize,
    pub skipped: usize,
    pub errors: usize,
    #[schema(value_type = String)]
    pub total_tokens_distributed: Decimal,
    pub items: Vec<DistributionItemResponse>,
}

// ============================================================
//  Plans, payments & commissions
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPlanResponse {
    #[schema(example = "vip")]
    pub id: String,
    pub name: String,
    pub description: String,
    #[schema(value_type = String, example = "138")]
    pub price: Decimal,
    pub currency: String,
    pub duration_days: u32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecordResponse {
    pub id: String,
    pub plan_id: String,
    pub plan_name: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub currency: String,
    #[schema(value_type = String)]
    pub balance_before: Decimal,
    #[schema(value_type = String)]
    pub balance_after: Decimal,
    pub subscription_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommissionResponse {
    pub id: String,
    pub referred_email: String,
    pub level: u32,
    #[schema(example = "unilevel_daily")]
    pub commission_type: String,
    #[schema(value_type = String, example = "0.10")]
    pub rate: Decimal,
    #[schema(value_type = String, example = "0.044")]
    pub amount: Decimal,
    #[schema(example = "2026-03-01")]
    pub earning_date: String,
    pub description: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LevelTotalResponse {
    pub level: u32,
    pub count: u64,
    #[schema(value_type = String)]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnilevelReportResponse {
    #[schema(example = "2026-03-01")]
    pub date: String,
    pub earners_processed: usize,
    pub credited: usize,
    pub skipped: usize,
    pub errors: usize,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    pub by_level: Vec<LevelTotalResponse>,
}

// ============================================================
//  Domain model -> DTO conversions (impl From<T>)
// ============================================================

impl From<&User> for UserResponse {
    fn from(u: &User) -> Self {
        Self {
            email: u.email.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            date_of_birth: u.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()),
            country: u.country.clone(),
            country_of_birth: u.country_of_birth.clone(),
            gender: u.gender.clone(),
            address: u.address.clone(),
            phone: u.phone.clone(),
            email_verified: u.email_verified,
            phone_verified: u.phone_verified,
            identity_verification_status: u.identity_status.to_string(),
            profile_completed: u.profile_completed,
            role: u.role.to_string(),
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

impl From<&Wallet> for WalletResponse {
    fn from(w: &Wallet) -> Self {
        Self {
            user_email: w.user_email.clone(),
            total_balance: w.total_balance,
            tic_balance: w.tic_balance,
            gic_balance: w.gic_balance,
            staking_balance: w.staking_balance,
            partner_wallet_balance: w.partner_wallet_balance,
            updated_at: w.updated_at.to_rfc3339(),
        }
    }
}

impl From<WalletTransaction> for TransactionResponse {
    fn from(t: WalletTransaction) -> Self {
        Self {
            transaction_id: t.transaction_id,
            kind: t.kind.to_string(),
            account: t.account.to_string(),
            amount: t.amount,
            balance_before: t.balance_before,
            balance_after: t.balance_after,
            description: t.description,
            reference_id: t.reference_id,
            metadata: t.metadata,
            created_at: t.created_at.to_rfc3339(),
        }
    }
}

impl From<PaymentMethod> for PaymentMethodResponse {
    fn from(m: PaymentMethod) -> Self {
        Self {
            id: m.id,
            name: m.name,
            network: m.network,
            currency: m.currency,
            deposit_address: m.deposit_address,
            min_amount: m.min_amount,
            max_amount: m.max_amount,
            processing_fee_rate: m.processing_fee_rate,
            fixed_fee: m.fixed_fee,
            network_fee: m.network_fee,
            is_active: m.is_active,
        }
    }
}

impl From<Deposit> for DepositResponse {
    fn from(d: Deposit) -> Self {
        Self {
            id: d.id,
            user_email: d.user_email,
            amount: d.amount,
            currency: d.currency,
            method_id: d.method_id,
            method_name: d.method_name,
            network: d.network,
            deposit_address: d.deposit_address,
            transaction_hash: d.transaction_hash,
            processing_fee: d.processing_fee,
            network_fee: d.network_fee,
            final_amount: d.final_amount,
            status: d.status.to_string(),
            admin_notes: d.admin_notes,
            approved_by: d.approved_by,
            approved_at: d.approved_at.map(|t| t.to_rfc3339()),
            rejected_by: d.rejected_by,
            rejected_at: d.rejected_at.map(|t| t.to_rfc3339()),
            expires_at: d.expires_at.to_rfc3339(),
            created_at: d.created_at.to_rfc3339(),
        }
    }
}

impl From<Withdrawal> for WithdrawalResponse {
    fn from(w: Withdrawal) -> Self {
        Self {
            id: w.id,
            user_email: w.user_email,
            method_id: w.method_id,
            method_name: w.method_name,
            network: w.network,
            destination_address: w.destination_address,
            amount: w.amount,
            currency: w.currency,
            processing_fee: w.processing_fee,
            network_fee: w.network_fee,
            final_amount: w.final_amount,
            status: w.status.to_string(),
            admin_notes: w.admin_notes,
            transaction_hash: w.transaction_hash,
            processed_by: w.processed_by,
            processed_at: w.processed_at.map(|t| t.to_rfc3339()),
            created_at: w.created_at.to_rfc3339(),
        }
    }
}

impl From<DepositStats> for DepositStatsResponse {
    fn from(s: DepositStats) -> Self {
        Self {
            total: s.total,
            pending: s.pending,
            approved: s.approved,
            total_amount: s.total_amount,
            pending_amount: s.pending_amount,
            deposits_today: s.deposits_today,
        }
    }
}

impl From<WithdrawalStats> for WithdrawalStatsResponse {
    fn from(s: WithdrawalStats) -> Self {
        Self {
            total: s.total,
            pending: s.pending,
            completed: s.completed,
            total_withdrawn: s.total_withdrawn,
        }
    }
}

impl From<&ReferralCode> for ReferralCodeResponse {
    fn from(c: &ReferralCode) -> Self {
        Self {
            code: c.code.clone(),
            link: c.link.clone(),
            created_at: c.created_at.to_rfc3339(),
        }
    }
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            user_email: n.user_email,
            title: n.title,
            message: n.message,
            kind: n.kind,
            priority: n.priority.to_string(),
            is_read: n.is_read,
            created_at: n.created_at.to_rfc3339(),
        }
    }
}

impl From<&Subscription> for SubscriptionResponse {
    fn from(s: &Subscription) -> Self {
        Self {
            id: s.id.clone(),
            user_email: s.user_email.clone(),
            plan_id: s.plan_id.clone(),
            plan_name: s.plan_name.clone(),
            status: s.status.to_string(),
            start_date: s.start_date.to_rfc3339(),
            end_date: s.end_date.to_rfc3339(),
        }
    }
}

impl From<DistributionItem> for DistributionItemResponse {
    fn from(i: DistributionItem) -> Self {
        let status = match i.status {
            tic_core::distribution::entity::DistributionItemStatus::Distributed => "distributed",
            tic_core::distribution::entity::DistributionItemStatus::Skipped => "skipped",
            tic_core::distribution::entity::DistributionItemStatus::Error => "error",
        };
        Self {
            subscription_id: i.subscription_id,
            user_email: i.user_email,
            plan_id: i.plan_id,
            status: status.to_string(),
            token_amount: i.token_amount,
            reason: i.reason,
        }
    }
}

impl From<DistributionReport> for DistributionReportResponse {
    fn from(r: DistributionReport) -> Self {
        Self {
            date: r.date.format("%Y-%m-%d").to_string(),
            total_subscriptions: r.total_subscriptions,
            distributed: r.distributed,
            skipped: r.skipped,
            errors: r.errors,
            total_tokens_distributed: r.total_tokens_distributed,
            items: r.items.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<&PaymentPlan> for PaymentPlanResponse {
    fn from(p: &PaymentPlan) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            description: p.description.clone(),
            price: p.price,
            currency: p.currency.clone(),
            duration_days: p.duration_days,
            is_active: p.is_active,
        }
    }
}

impl From<PaymentRecord> for PaymentRecordResponse {
    fn from(p: PaymentRecord) -> Self {
        Self {
            id: p.id,
            plan_id: p.plan_id,
            plan_name: p.plan_name,
            amount: p.amount,
            currency: p.currency,
            balance_before: p.balance_before,
            balance_after: p.balance_after,
            subscription_id: p.subscription_id,
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

impl From<CommissionEarning> for CommissionResponse {
    fn from(c: CommissionEarning) -> Self {
        Self {
            id: c.id,
            referred_email: c.referred_email,
            level: c.level,
            commission_type: c.kind.to_string(),
            rate: c.rate,
            amount: c.amount,
            earning_date: c.earning_date.format("%Y-%m-%d").to_string(),
            description: c.description,
            created_at: c.created_at.to_rfc3339(),
        }
    }
}

impl From<LevelTotal> for LevelTotalResponse {
    fn from(t: LevelTotal) -> Self {
        Self {
            level: t.level,
            count: t.count,
            amount: t.amount,
        }
    }
}

impl From<UnilevelReport> for UnilevelReportResponse {
    fn from(r: UnilevelReport) -> Self {
        Self {
            date: r.date.format("%Y-%m-%d").to_string(),
            earners_processed: r.earners_processed,
            credited: r.credited,
            skipped: r.skipped,
            errors: r.errors,
            total_amount: r.total_amount,
            by_level: r.by_level.into_iter().map(Into::into).collect(),
        }
    }
}
