use super::entity::{
    Deposit, DepositFilter, DepositStats, DepositStatus, DepositUpdate, PaymentMethod,
    ReviewDecision, Withdrawal, WithdrawalStats, WithdrawalStatus,
};
use super::error::FundingError;
use crate::common::Page;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// # Summary
/// Deposit / withdrawal requests and the wallet effects of their state
/// transitions.
///
/// # Invariants
/// - A status change and the wallet posting it implies commit together or
///   not at all.
/// - Review transitions are guarded on `status = 'pending'`.
#[async_trait]
pub trait FundingStore: Send + Sync {
    // --- payment methods ---

    async fn save_payment_method(&self, method: &PaymentMethod) -> Result<(), FundingError>;

    async fn get_payment_method(&self, id: &str) -> Result<Option<PaymentMethod>, FundingError>;

    async fn list_payment_methods(&self, active_only: bool)
        -> Result<Vec<PaymentMethod>, FundingError>;

    // --- deposits ---

    async fn create_deposit(&self, deposit: &Deposit) -> Result<(), FundingError>;

    async fn get_deposit(&self, id: &str) -> Result<Option<Deposit>, FundingError>;

    async fn list_user_deposits(&self, email: &str, page: Page)
        -> Result<Vec<Deposit>, FundingError>;

    /// Returns the requested page and whether more rows follow it.
    async fn list_deposits(&self, filter: &DepositFilter) -> Result<(Vec<Deposit>, bool), FundingError>;

    /// # Arguments
    /// * `day_start` - start of "today" for `deposits_today`.
    async fn deposit_stats(&self, day_start: DateTime<Utc>) -> Result<DepositStats, FundingError>;

    /// # Summary
    /// Approves or rejects a pending deposit.
    ///
    /// # Logic
    /// 1. Missing → `NotFound`; not pending → `InvalidState`.
    /// 2. Approve: status `approved`, audit fields, wallet credit with a
    ///    `deposit_<id>` ledger row, owner notification.
    /// 3. Reject: status `rejected`, audit fields, owner notification.
    async fn review_deposit(
        &self,
        id: &str,
        decision: &ReviewDecision,
        now: DateTime<Utc>,
    ) -> Result<Deposit, FundingError>;

    /// # Summary
    /// Admin override of a deposit's status.
    ///
    /// # Logic
    /// Moving into a crediting status credits the wallet unless the
    /// `deposit_<id>` posting already exists.
    async fn set_deposit_status(
        &self,
        id: &str,
        status: DepositStatus,
        admin_email: &str,
        notes: Option<String>,
        transaction_hash: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<DepositUpdate, FundingError>;

    /// Deletes a deposit that never moved money; `InvalidState` otherwise.
    async fn delete_deposit(&self, id: &str) -> Result<Deposit, FundingError>;

    // --- withdrawals ---

    /// Inserts the request and holds its amount from `total`, atomically.
    async fn create_withdrawal(&self, withdrawal: &Withdrawal) -> Result<(), FundingError>;

    async fn get_withdrawal(&self, id: &str) -> Result<Option<Withdrawal>, FundingError>;

    async fn list_user_withdrawals(&self, email: &str, page: Page)
        -> Result<Vec<Withdrawal>, FundingError>;

    async fn list_withdrawals(
        &self,
        status: Option<WithdrawalStatus>,
        page: Page,
    ) -> Result<Vec<Withdrawal>, FundingError>;

    async fn withdrawal_stats(&self, email: &str) -> Result<WithdrawalStats, FundingError>;

    /// # Summary
    /// Approves or rejects a pending withdrawal; rejection refunds the hold.
    async fn review_withdrawal(
        &self,
        id: &str,
        decision: &ReviewDecision,
        now: DateTime<Utc>,
    ) -> Result<Withdrawal, FundingError>;

    /// # Summary
    /// Marks an approved withdrawal as paid out.
    ///
    /// # Logic
    /// 1. Missing → `NotFound`; not `approved` → `InvalidState`.
    /// 2. Status `completed`, audit fields and the payout hash when given,
    ///    owner notification. The hold was taken at creation, so no money
    ///    moves.
    async fn complete_withdrawal(
        &self,
        id: &str,
        admin_email: &str,
        transaction_hash: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Withdrawal, FundingError>;

    /// Owner cancellation of a pending withdrawal, with refund. Requests of
    /// other users are reported as `NotFound`.
    async fn cancel_withdrawal(
        &self,
        id: &str,
        user_email: &str,
        now: DateTime<Utc>,
    ) -> Result<Withdrawal, FundingError>;
}
