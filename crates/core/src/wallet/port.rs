use super::entity::{PostOutcome, Posting, Wallet, WalletTransaction};
use super::error::WalletError;
use async_trait::async_trait;

/// # Summary
/// Wallet balances and their ledger.
///
/// # Invariants
/// - Every balance change and its ledger rows commit atomically.
/// - Concurrent postings on one wallet never lose updates.
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn get_wallet(&self, email: &str) -> Result<Option<Wallet>, WalletError>;

    async fn get_or_create_wallet(&self, email: &str) -> Result<Wallet, WalletError>;

    /// # Summary
    /// Applies a batch of postings in one transaction.
    ///
    /// # Logic
    /// 1. If any posting's `(transaction_id, user_email)` is already in the
    ///    ledger, nothing is applied and `applied = false` is returned.
    /// 2. Each posting's wallet is created on demand.
    /// 3. Each change is applied; a slot going negative aborts the whole
    ///    batch with `InsufficientBalance`.
    /// 4. One ledger row is written per change.
    async fn post(&self, postings: &[Posting]) -> Result<PostOutcome, WalletError>;

    /// Newest first.
    async fn list_transactions(
        &self,
        email: &str,
        limit: u32,
    ) -> Result<Vec<WalletTransaction>, WalletError>;
}
