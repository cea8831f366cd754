use super::error::FundingError;
use crate::common::Page;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hours before an untouched deposit request is considered expired.
pub const DEPOSIT_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DepositStatus {
    Pending,
    Approved,
    Received,
    Confirmed,
    Completed,
    Rejected,
    Expired,
    Failed,
}

impl DepositStatus {
    /// Statuses in which the deposit amount belongs in the user's wallet.
    pub fn credits_wallet(&self) -> bool {
        matches!(self, DepositStatus::Approved | DepositStatus::Completed)
    }

    /// Statuses an admin may set directly.
    pub fn is_admin_settable(&self) -> bool {
        matches!(
            self,
            DepositStatus::Pending
                | DepositStatus::Approved
                | DepositStatus::Rejected
                | DepositStatus::Completed
                | DepositStatus::Failed
        )
    }
}

impl fmt::Display for DepositStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DepositStatus::Pending => "pending",
            DepositStatus::Approved => "approved",
            DepositStatus::Received => "received",
            DepositStatus::Confirmed => "confirmed",
            DepositStatus::Completed => "completed",
            DepositStatus::Rejected => "rejected",
            DepositStatus::Expired => "expired",
            DepositStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl FromStr for DepositStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DepositStatus::Pending),
            "approved" => Ok(DepositStatus::Approved),
            "received" => Ok(DepositStatus::Received),
            "confirmed" => Ok(DepositStatus::Confirmed),
            "completed" => Ok(DepositStatus::Completed),
            "rejected" => Ok(DepositStatus::Rejected),
            "expired" => Ok(DepositStatus::Expired),
            "failed" => Ok(DepositStatus::Failed),
            _ => Err(format!("Invalid deposit status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
    Cancelled,
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Rejected => "rejected",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for WithdrawalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WithdrawalStatus::Pending),
            "approved" => Ok(WithdrawalStatus::Approved),
            "rejected" => Ok(WithdrawalStatus::Rejected),
            "completed" => Ok(WithdrawalStatus::Completed),
            "cancelled" => Ok(WithdrawalStatus::Cancelled),
            _ => Err(format!("Invalid withdrawal status: {}", s)),
        }
    }
}

/// Admin decision on a pending request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl FromStr for ReviewAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(ReviewAction::Approve),
            "reject" => Ok(ReviewAction::Reject),
            _ => Err("Invalid action. Must be approve or reject".to_string()),
        }
    }
}

/// Admin step on a withdrawal: the review of a pending request, or marking
/// an approved payout as sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawalAction {
    Review(ReviewAction),
    Complete,
}

impl FromStr for WithdrawalAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "complete" => Ok(WithdrawalAction::Complete),
            other => other
                .parse()
                .map(WithdrawalAction::Review)
                .map_err(|_| "Invalid action. Must be approve, reject or complete".to_string()),
        }
    }
}

/// Who decided what, with the optional audit payload.
#[derive(Debug, Clone)]
pub struct ReviewDecision {
    pub action: ReviewAction,
    pub admin_email: String,
    pub notes: Option<String>,
    pub transaction_hash: Option<String>,
}

/// # Summary
/// Deposit or withdrawal rail (e.g. USDT on TRC20) with limits and fees.
///
/// # Invariants
/// - `min_amount <= max_amount`.
/// - `processing_fee_rate` is a fraction (0.01 = 1%).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    pub name: String,
    pub network: String,
    pub currency: String,
    pub deposit_address: Option<String>,
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    pub processing_fee_rate: Decimal,
    pub fixed_fee: Decimal,
    pub network_fee: Decimal,
    pub is_active: bool,
}

impl PaymentMethod {
    /// `amount * processing_fee_rate + fixed_fee`, rounded to cents.
    pub fn processing_fee(&self, amount: Decimal) -> Decimal {
        (amount * self.processing_fee_rate + self.fixed_fee).round_dp(2)
    }

    /// # Summary
    /// Rejects inactive methods and amounts outside `[min_amount, max_amount]`.
    pub fn check_amount(&self, amount: Decimal) -> Result<(), FundingError> {
        if !self.is_active {
            return Err(FundingError::Validation(format!(
                "Payment method {} is not active",
                self.id
            )));
        }
        if amount <= Decimal::ZERO {
            return Err(FundingError::Validation("Amount must be greater than 0".into()));
        }
        if amount < self.min_amount {
            return Err(FundingError::Validation(format!(
                "Minimum amount is {}",
                self.min_amount
            )));
        }
        if amount > self.max_amount {
            return Err(FundingError::Validation(format!(
                "Maximum amount is {}",
                self.max_amount
            )));
        }
        Ok(())
    }
}

/// # Summary
/// User-submitted funding request awaiting admin action.
///
/// # Invariants
/// - `final_amount = amount - processing_fee - network_fee`.
/// - The wallet is credited at most once, under ledger id `deposit_<id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deposit {
    pub id: String,
    pub user_email: String,
    pub amount: Decimal,
    pub currency: String,
    pub method_id: String,
    pub method_name: String,
    pub network: String,
    pub deposit_address: Option<String>,
    pub transaction_hash: Option<String>,
    pub processing_fee: Decimal,
    pub network_fee: Decimal,
    pub final_amount: Decimal,
    pub status: DepositStatus,
    pub admin_notes: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<String>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deposit {
    /// # Summary
    /// Builds a pending request priced with `method`'s fees.
    ///
    /// # Returns
    /// * `Err(Validation)` if the method refuses the amount or fees eat it all.
    pub fn new_pending(
        id: String,
        user_email: String,
        amount: Decimal,
        method: &PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<Self, FundingError> {
        method.check_amount(amount)?;
        let processing_fee = method.processing_fee(amount);
        let final_amount = amount - processing_fee - method.network_fee;
        if final_amount <= Decimal::ZERO {
            return Err(FundingError::Validation(
                "Amount does not cover the deposit fees".into(),
            ));
        }
        Ok(Self {
            id,
            user_email,
            amount,
            currency: method.currency.clone(),
            method_id: method.id.clone(),
            method_name: method.name.clone(),
            network: method.network.clone(),
            deposit_address: method.deposit_address.clone(),
            transaction_hash: None,
            processing_fee,
            network_fee: method.network_fee,
            final_amount,
            status: DepositStatus::Pending,
            admin_notes: None,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            expires_at: now + Duration::hours(DEPOSIT_TTL_HOURS),
            created_at: now,
            updated_at: now,
        })
    }

    /// Amount credited to the wallet: `final_amount`, or `amount` when fees
    /// were never recorded.
    pub fn credit_amount(&self) -> Decimal {
        if self.final_amount > Decimal::ZERO {
            self.final_amount
        } else {
            self.amount
        }
    }

    /// Ledger id that makes crediting idempotent.
    pub fn credit_transaction_id(&self) -> String {
        format!("deposit_{}", self.id)
    }
}

/// # Summary
/// Payout request. The amount is held (debited) from `total` on creation.
///
/// # Invariants
/// - `final_amount = amount - processing_fee - network_fee` is what leaves the platform.
/// - Rejection and cancellation refund `amount` under ledger id `refund_<id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: String,
    pub user_email: String,
    pub method_id: String,
    pub method_name: String,
    pub network: String,
    pub destination_address: String,
    pub amount: Decimal,
    pub currency: String,
    pub processing_fee: Decimal,
    pub network_fee: Decimal,
    pub final_amount: Decimal,
    pub status: WithdrawalStatus,
    pub admin_notes: Option<String>,
    pub transaction_hash: Option<String>,
    pub processed_by: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Withdrawal {
    pub fn new_pending(
        id: String,
        user_email: String,
        destination_address: String,
        amount: Decimal,
        method: &PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<Self, FundingError> {
        if destination_address.trim().is_empty() {
            return Err(FundingError::Validation("Destination address is required".into()));
        }
        method.check_amount(amount)?;
        let processing_fee = method.processing_fee(amount);
        let final_amount = amount - processing_fee - method.network_fee;
        if final_amount <= Decimal::ZERO {
            return Err(FundingError::Validation(
                "Amount does not cover the withdrawal fees".into(),
            ));
        }
        Ok(Self {
            id,
            user_email,
            method_id: method.id.clone(),
            method_name: method.name.clone(),
            network: method.network.clone(),
            destination_address: destination_address.trim().to_string(),
            amount,
            currency: method.currency.clone(),
            processing_fee,
            network_fee: method.network_fee,
            final_amount,
            status: WithdrawalStatus::Pending,
            admin_notes: None,
            transaction_hash: None,
            processed_by: None,
            processed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn hold_transaction_id(&self) -> String {
        format!("withdrawal_{}", self.id)
    }

    pub fn refund_transaction_id(&self) -> String {
        format!("refund_{}", self.id)
    }
}

/// Admin deposit list filter.
#[derive(Debug, Clone, Default)]
pub struct DepositFilter {
    pub status: Option<DepositStatus>,
    pub network: Option<String>,
    /// Case-insensitive substring of the owner email.
    pub user_email: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub page: Page,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DepositStats {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub total_amount: Decimal,
    pub pending_amount: Decimal,
    pub deposits_today: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WithdrawalStats {
    pub total: u64,
    pub pending: u64,
    pub completed: u64,
    /// Sum of approved and completed withdrawal amounts.
    pub total_withdrawn: Decimal,
}

/// Result of an admin status override on a deposit.
#[derive(Debug, Clone)]
pub struct DepositUpdate {
    pub deposit: Deposit,
    /// `true` when this call moved money into the wallet.
    pub credited: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_withdrawal_actions() {
        assert_eq!(
            WithdrawalAction::from_str("approve"),
            Ok(WithdrawalAction::Review(ReviewAction::Approve))
        );
        assert_eq!(WithdrawalAction::from_str("complete"), Ok(WithdrawalAction::Complete));
        assert!(WithdrawalAction::from_str("pay").is_err());
        assert!(ReviewAction::from_str("complete").is_err());
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn method() -> PaymentMethod {
        PaymentMethod {
            id: "usdt-trc20".into(),
            name: "USDT".into(),
            network: "TRC20".into(),
            currency: "USD".into(),
            deposit_address: Some("TXYZ".into()),
            min_amount: d("10"),
            max_amount: d("10000"),
            processing_fee_rate: d("0.01"),
            fixed_fee: d("1"),
            network_fee: d("0.5"),
            is_active: true,
        }
    }

    #[test]
    fn test_deposit_fees_and_expiry() {
        let now = Utc::now();
        let dep = Deposit::new_pending("d1".into(), "a@b.com".into(), d("100"), &method(), now).unwrap();
        assert_eq!(dep.processing_fee, d("2.00"));
        assert_eq!(dep.final_amount, d("97.50"));
        assert_eq!(dep.credit_amount(), d("97.50"));
        assert_eq!(dep.expires_at, now + Duration::hours(24));
        assert_eq!(dep.credit_transaction_id(), "deposit_d1");
    }

    #[test]
    fn test_method_limits() {
        let m = method();
        assert!(m.check_amount(d("9.99")).is_err());
        assert!(m.check_amount(d("10001")).is_err());
        assert!(m.check_amount(d("-1")).is_err());
        let mut inactive = method();
        inactive.is_active = false;
        assert!(inactive.check_amount(d("50")).is_err());
    }

    #[test]
    fn test_withdrawal_requires_destination() {
        let now = Utc::now();
        assert!(Withdrawal::new_pending("w1".into(), "a@b.com".into(), "  ".into(), d("50"), &method(), now).is_err());
        let w = Withdrawal::new_pending("w1".into(), "a@b.com".into(), "TDEST".into(), d("50"), &method(), now).unwrap();
        assert_eq!(w.processing_fee, d("1.50"));
        assert_eq!(w.final_amount, d("48.00"));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("completed".parse::<DepositStatus>().unwrap(), DepositStatus::Completed);
        assert!("done".parse::<DepositStatus>().is_err());
        assert!(!DepositStatus::Expired.is_admin_settable());
        assert!("maybe".parse::<ReviewAction>().is_err());
    }
}
