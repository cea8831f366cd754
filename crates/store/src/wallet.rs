use crate::db::Database;
use crate::ledger::{load_or_create_wallet, post_in_tx, transaction_from_row, wallet_err, wallet_from_row};
use async_trait::async_trait;
use chrono::Utc;
use tic_core::wallet::entity::{PostOutcome, Posting, Wallet, WalletTransaction};
use tic_core::wallet::error::WalletError;
use tic_core::wallet::port::WalletStore;
use tracing::info;

/// # Summary
/// SQLite implementation of [`WalletStore`].
///
/// # Invariants
/// - Balances are stored as decimal text, never as floats.
pub struct SqliteWalletStore {
    db: Database,
}

impl SqliteWalletStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WalletStore for SqliteWalletStore {
    async fn get_wallet(&self, email: &str) -> Result<Option<Wallet>, WalletError> {
        let row = sqlx::query("SELECT * FROM wallets WHERE user_email = ?")
            .bind(email)
            .fetch_optional(self.db.pool())
            .await
            .map_err(wallet_err)?;
        row.map(|r| wallet_from_row(&r)).transpose().map_err(wallet_err)
    }

    async fn get_or_create_wallet(&self, email: &str) -> Result<Wallet, WalletError> {
        let mut conn = self.db.pool().acquire().await.map_err(wallet_err)?;
        load_or_create_wallet(&mut *conn, email, Utc::now())
            .await
            .map_err(wallet_err)
    }

    async fn post(&self, postings: &[Posting]) -> Result<PostOutcome, WalletError> {
        let mut tx = self.db.pool().begin().await.map_err(wallet_err)?;
        let outcome = post_in_tx(&mut *tx, postings, Utc::now()).await?;
        tx.commit().await.map_err(wallet_err)?;

        if outcome.applied {
            for posting in postings {
                info!(
                    "Posted {} ({}) for {}",
                    posting.transaction_id, posting.kind, posting.user_email
                );
            }
        }
        Ok(outcome)
    }

    async fn list_transactions(
        &self,
        email: &str,
        limit: u32,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        let rows = sqlx::query(
            "SELECT * FROM wallet_transactions WHERE user_email = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(email)
        .bind(i64::from(limit))
        .fetch_all(self.db.pool())
        .await
        .map_err(wallet_err)?;

        rows.iter()
            .map(transaction_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(wallet_err)
    }
}
