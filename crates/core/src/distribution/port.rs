use super::entity::{
    CreditOutcome, DistributionDaySummary, DistributionRecord, DistributionTotals, Subscription,
};
use crate::common::Page;
use crate::store::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

/// # Summary
/// Subscriptions and their daily token credits.
///
/// # Invariants
/// - At most one distribution per `(subscription_id, date)`.
#[async_trait]
pub trait DistributionStore: Send + Sync {
    async fn create_subscription(&self, subscription: &Subscription) -> Result<(), StoreError>;

    /// Subscriptions with status `active` whose `end_date >= now`, oldest first.
    async fn active_subscriptions(&self, now: DateTime<Utc>) -> Result<Vec<Subscription>, StoreError>;

    /// # Summary
    /// Credits `tokens` to the subscriber's `tic` slot for `date`.
    ///
    /// # Logic
    /// The distribution row, the wallet update and its `distribution` ledger
    /// row commit together; an existing row for the day short-circuits to
    /// `AlreadyDistributed`.
    async fn credit_daily(
        &self,
        subscription: &Subscription,
        date: NaiveDate,
        tokens: Decimal,
        now: DateTime<Utc>,
    ) -> Result<CreditOutcome, StoreError>;

    async fn day_summary(&self, date: NaiveDate) -> Result<DistributionDaySummary, StoreError>;

    /// Every subscription of `email`, newest first.
    async fn list_user_subscriptions(&self, email: &str) -> Result<Vec<Subscription>, StoreError>;

    /// Daily credits of `email`, newest first, optionally for one plan.
    /// The flag tells whether more rows follow the page.
    async fn list_user_distributions(
        &self,
        email: &str,
        plan_id: Option<&str>,
        page: Page,
    ) -> Result<(Vec<DistributionRecord>, bool), StoreError>;

    async fn user_distribution_totals(
        &self,
        email: &str,
        plan_id: Option<&str>,
    ) -> Result<DistributionTotals, StoreError>;
}
