use super::entity::{
    CommissionEarning, CommissionFilter, CommissionSummary, NetworkMember, UnilevelReport,
};
use crate::common::Page;
use crate::distribution::entity::CreditOutcome;
use crate::store::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// # Summary
/// Referral network traversal and the commission ledger.
///
/// # Invariants
/// - A commission row, the partner wallet credit and the earner's
///   `total_earnings` bump commit together.
#[async_trait]
pub trait CommissionStore: Send + Sync {
    /// Members below `email` down to `depth` levels, ordered by level then
    /// join date. A user appears once, at the shallowest level reached.
    async fn downline(&self, email: &str, depth: u32) -> Result<Vec<NetworkMember>, StoreError>;

    /// Users with at least one direct referral.
    async fn referrers(&self) -> Result<Vec<String>, StoreError>;

    /// Number of active, unexpired VIP plans per holder.
    async fn active_vip_counts(&self, now: DateTime<Utc>) -> Result<HashMap<String, u32>, StoreError>;

    /// # Summary
    /// Records `earning` and credits its amount to the earner's partner
    /// wallet.
    ///
    /// # Returns
    /// * `AlreadyDistributed` when the same source was already credited.
    async fn credit(&self, earning: &CommissionEarning, now: DateTime<Utc>)
        -> Result<CreditOutcome, StoreError>;

    /// Newest first; the flag tells whether more rows follow the page.
    async fn list_commissions(
        &self,
        earner_email: &str,
        filter: &CommissionFilter,
        page: Page,
    ) -> Result<(Vec<CommissionEarning>, bool), StoreError>;

    async fn summary(&self, earner_email: &str) -> Result<CommissionSummary, StoreError>;

    /// Total earned by `earner_email` per downline member.
    async fn earnings_by_member(&self, earner_email: &str) -> Result<HashMap<String, Decimal>, StoreError>;

    /// Daily commissions already stored for `date`.
    async fn day_report(&self, date: NaiveDate) -> Result<UnilevelReport, StoreError>;
}
