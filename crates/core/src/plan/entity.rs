use crate::commission::entity::CommissionEarning;
use crate::distribution::entity::Subscription;
use crate::wallet::entity::Wallet;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// # Summary
/// A subscription plan users buy from their main balance.
///
/// # Invariants
/// - `price` is USD and positive; `duration_days > 0`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentPlan {
    /// `starter` or `vip`.
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub currency: String,
    pub duration_days: u32,
    pub is_active: bool,
    pub sort_order: i64,
}

/// Receipt of a completed plan purchase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentRecord {
    pub id: String,
    pub user_email: String,
    pub plan_id: String,
    pub plan_name: String,
    pub amount: Decimal,
    pub currency: String,
    /// Main balance around the debit.
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub subscription_id: String,
    pub created_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Ledger id of the debit.
    pub fn transaction_id(&self) -> String {
        format!("payment_{}", self.id)
    }
}

/// Everything a purchase produced, committed together.
#[derive(Debug, Clone)]
pub struct Purchase {
    pub payment: PaymentRecord,
    pub subscription: Subscription,
    pub wallet: Wallet,
    /// Upline commissions paid on the purchase.
    pub commissions: Vec<CommissionEarning>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PaymentStats {
    pub total_payments: u64,
    pub total_spent: Decimal,
}
