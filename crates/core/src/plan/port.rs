use super::entity::{PaymentPlan, PaymentRecord, PaymentStats, Purchase};
use super::error::PlanError;
use crate::common::Page;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// # Summary
/// Plan catalogue and plan purchases.
///
/// # Invariants
/// - A purchase debits the main balance, records the payment, opens the
///   subscription and pays the upline commissions in one transaction.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Ordered by `sort_order`.
    async fn list_plans(&self, active_only: bool) -> Result<Vec<PaymentPlan>, PlanError>;

    async fn get_plan(&self, id: &str) -> Result<Option<PaymentPlan>, PlanError>;

    /// # Summary
    /// Buys `plan_id` for `email` with the main balance.
    ///
    /// # Logic
    /// 1. Unknown plan → `NotFound`; inactive plan → `Inactive`.
    /// 2. Debits `total` by the plan price (`InsufficientBalance` aborts).
    /// 3. Stores the payment and an active subscription lasting
    ///    `duration_days`.
    /// 4. For VIP plans, credits the level 1 and 2 purchase commissions to
    ///    the buyer's upline.
    /// 5. Leaves an inbox notification for the buyer.
    async fn purchase(&self, email: &str, plan_id: &str, now: DateTime<Utc>)
        -> Result<Purchase, PlanError>;

    /// Newest first; the flag tells whether more rows follow the page.
    async fn list_payments(&self, email: &str, page: Page)
        -> Result<(Vec<PaymentRecord>, bool), PlanError>;

    async fn payment_stats(&self, email: &str) -> Result<PaymentStats, PlanError>;
}
