use crate::db::{Database, from_millis, opt_from_millis, parse_decimal, parse_enum, to_millis};
use crate::ledger::{is_posted, post_in_tx};
use crate::notification::insert_notification;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use tic_core::common::Page;
use tic_core::common::id::new_id;
use tic_core::funding::entity::{
    Deposit, DepositFilter, DepositStats, DepositStatus, DepositUpdate, PaymentMethod,
    ReviewAction, ReviewDecision, Withdrawal, WithdrawalStats, WithdrawalStatus,
};
use tic_core::funding::error::FundingError;
use tic_core::funding::port::FundingStore;
use tic_core::notify::entity::{Notification, NotificationPriority};
use tic_core::wallet::entity::{BalanceChange, Posting, TransactionKind, WalletAccount};
use tracing::info;

/// # Summary
/// SQLite implementation of [`FundingStore`].
///
/// # Invariants
/// - Every transition that moves money runs the status update, the ledger
///   posting and the owner's inbox entry inside one transaction.
pub struct SqliteFundingStore {
    db: Database,
}

impl SqliteFundingStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn storage(e: impl std::fmt::Display) -> FundingError {
    FundingError::Storage(e.to_string())
}

fn col<T>(row: &SqliteRow, name: &str) -> Result<T, FundingError>
where
    T: for<'r> sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name).map_err(storage)
}

fn dec(row: &SqliteRow, name: &str) -> Result<Decimal, FundingError> {
    let raw: String = col(row, name)?;
    parse_decimal(&raw).map_err(storage)
}

fn time(row: &SqliteRow, name: &str) -> Result<DateTime<Utc>, FundingError> {
    from_millis(col(row, name)?).map_err(storage)
}

fn opt_time(row: &SqliteRow, name: &str) -> Result<Option<DateTime<Utc>>, FundingError> {
    opt_from_millis(col(row, name)?).map_err(storage)
}

fn method_from_row(row: &SqliteRow) -> Result<PaymentMethod, FundingError> {
    Ok(PaymentMethod {
        id: col(row, "id")?,
        name: col(row, "name")?,
        network: col(row, "network")?,
        currency: col(row, "currency")?,
        deposit_address: col(row, "deposit_address")?,
        min_amount: dec(row, "min_amount")?,
        max_amount: dec(row, "max_amount")?,
        processing_fee_rate: dec(row, "processing_fee_rate")?,
        fixed_fee: dec(row, "fixed_fee")?,
        network_fee: dec(row, "network_fee")?,
        is_active: col(row, "is_active")?,
    })
}

fn deposit_from_row(row: &SqliteRow) -> Result<Deposit, FundingError> {
    let status: String = col(row, "status")?;
    Ok(Deposit {
        id: col(row, "id")?,
        user_email: col(row, "user_email")?,
        amount: dec(row, "amount")?,
        currency: col(row, "currency")?,
        method_id: col(row, "method_id")?,
        method_name: col(row, "method_name")?,
        network: col(row, "network")?,
        deposit_address: col(row, "deposit_address")?,
        transaction_hash: col(row, "transaction_hash")?,
        processing_fee: dec(row, "processing_fee")?,
        network_fee: dec(row, "network_fee")?,
        final_amount: dec(row, "final_amount")?,
        status: parse_enum(&status).map_err(storage)?,
        admin_notes: col(row, "admin_notes")?,
        approved_by: col(row, "approved_by")?,
        approved_at: opt_time(row, "approved_at")?,
        rejected_by: col(row, "rejected_by")?,
        rejected_at: opt_time(row, "rejected_at")?,
        expires_at: time(row, "expires_at")?,
        created_at: time(row, "created_at")?,
        updated_at: time(row, "updated_at")?,
    })
}

fn withdrawal_from_row(row: &SqliteRow) -> Result<Withdrawal, FundingError> {
    let status: String = col(row, "status")?;
    Ok(Withdrawal {
        id: col(row, "id")?,
        user_email: col(row, "user_email")?,
        method_id: col(row, "method_id")?,
        method_name: col(row, "method_name")?,
        network: col(row, "network")?,
        destination_address: col(row, "destination_address")?,
        amount: dec(row, "amount")?,
        currency: col(row, "currency")?,
        processing_fee: dec(row, "processing_fee")?,
        network_fee: dec(row, "network_fee")?,
        final_amount: dec(row, "final_amount")?,
        status: parse_enum(&status).map_err(storage)?,
        admin_notes: col(row, "admin_notes")?,
        transaction_hash: col(row, "transaction_hash")?,
        processed_by: col(row, "processed_by")?,
        processed_at: opt_time(row, "processed_at")?,
        created_at: time(row, "created_at")?,
        updated_at: time(row, "updated_at")?,
    })
}

async fn fetch_deposit(conn: &mut SqliteConnection, id: &str) -> Result<Option<Deposit>, FundingError> {
    let row = sqlx::query("SELECT * FROM deposits WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(storage)?;
    row.as_ref().map(deposit_from_row).transpose()
}

async fn fetch_withdrawal(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<Withdrawal>, FundingError> {
    let row = sqlx::query("SELECT * FROM withdrawals WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(storage)?;
    row.as_ref().map(withdrawal_from_row).transpose()
}

/// Rewrites the mutable columns of `deposit`, guarded on its previous status.
async fn update_deposit(
    conn: &mut SqliteConnection,
    deposit: &Deposit,
    previous: DepositStatus,
) -> Result<(), FundingError> {
    let result = sqlx::query(
        r#"
        UPDATE deposits
        SET status = ?, admin_notes = ?, transaction_hash = ?, approved_by = ?, approved_at = ?,
            rejected_by = ?, rejected_at = ?, updated_at = ?
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(deposit.status.to_string())
    .bind(&deposit.admin_notes)
    .bind(&deposit.transaction_hash)
    .bind(&deposit.approved_by)
    .bind(deposit.approved_at.map(to_millis))
    .bind(&deposit.rejected_by)
    .bind(deposit.rejected_at.map(to_millis))
    .bind(to_millis(deposit.updated_at))
    .bind(&deposit.id)
    .bind(previous.to_string())
    .execute(&mut *conn)
    .await
    .map_err(storage)?;

    if result.rows_affected() == 0 {
        return Err(FundingError::InvalidState {
            kind: "Deposit",
            id: deposit.id.clone(),
            status: previous.to_string(),
        });
    }
    Ok(())
}

async fn update_withdrawal(
    conn: &mut SqliteConnection,
    withdrawal: &Withdrawal,
    previous: WithdrawalStatus,
) -> Result<(), FundingError> {
    let result = sqlx::query(
        r#"
        UPDATE withdrawals
        SET status = ?, admin_notes = ?, transaction_hash = ?, processed_by = ?, processed_at = ?,
            updated_at = ?
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(withdrawal.status.to_string())
    .bind(&withdrawal.admin_notes)
    .bind(&withdrawal.transaction_hash)
    .bind(&withdrawal.processed_by)
    .bind(withdrawal.processed_at.map(to_millis))
    .bind(to_millis(withdrawal.updated_at))
    .bind(&withdrawal.id)
    .bind(previous.to_string())
    .execute(&mut *conn)
    .await
    .map_err(storage)?;

    if result.rows_affected() == 0 {
        return Err(FundingError::InvalidState {
            kind: "Withdrawal",
            id: withdrawal.id.clone(),
            status: previous.to_string(),
        });
    }
    Ok(())
}

fn credit_posting(deposit: &Deposit) -> Posting {
    Posting::new(
        deposit.user_email.clone(),
        deposit.credit_transaction_id(),
        TransactionKind::Deposit,
        format!("Deposit via {}", deposit.method_name),
    )
    .with_change(BalanceChange::credit(WalletAccount::Total, deposit.credit_amount()))
    .with_reference(deposit.id.clone())
    .with_metadata(serde_json::json!({
        "method_id": deposit.method_id,
        "network": deposit.network,
        "transaction_hash": deposit.transaction_hash,
    }))
}

fn refund_posting(withdrawal: &Withdrawal, description: &str) -> Posting {
    Posting::new(
        withdrawal.user_email.clone(),
        withdrawal.refund_transaction_id(),
        TransactionKind::Refund,
        description,
    )
    .with_change(BalanceChange::credit(WalletAccount::Total, withdrawal.amount))
    .with_reference(withdrawal.id.clone())
}

fn inbox(
    email: &str,
    title: &str,
    message: String,
    kind: &str,
    priority: NotificationPriority,
    now: DateTime<Utc>,
) -> Notification {
    Notification::new(new_id(), email, title, message, kind, priority, now)
}

async fn notify_owner(conn: &mut SqliteConnection, n: &Notification) -> Result<(), FundingError> {
    insert_notification(conn, n).await.map_err(storage)
}

fn not_pending_deposit(deposit: &Deposit) -> FundingError {
    FundingError::InvalidState {
        kind: "Deposit",
        id: deposit.id.clone(),
        status: deposit.status.to_string(),
    }
}

fn not_pending_withdrawal(withdrawal: &Withdrawal) -> FundingError {
    FundingError::InvalidState {
        kind: "Withdrawal",
        id: withdrawal.id.clone(),
        status: withdrawal.status.to_string(),
    }
}

#[async_trait]
impl FundingStore for SqliteFundingStore {
    async fn save_payment_method(&self, method: &PaymentMethod) -> Result<(), FundingError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO payment_methods (
                id, name, network, currency, deposit_address, min_amount, max_amount,
                processing_fee_rate, fixed_fee, network_fee, is_active
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&method.id)
        .bind(&method.name)
        .bind(&method.network)
        .bind(&method.currency)
        .bind(&method.deposit_address)
        .bind(method.min_amount.to_string())
        .bind(method.max_amount.to_string())
        .bind(method.processing_fee_rate.to_string())
        .bind(method.fixed_fee.to_string())
        .bind(method.network_fee.to_string())
        .bind(method.is_active)
        .execute(self.db.pool())
        .await
        .map_err(storage)?;
        info!("Saved payment method {} ({})", method.id, method.network);
        Ok(())
    }

    async fn get_payment_method(&self, id: &str) -> Result<Option<PaymentMethod>, FundingError> {
        let row = sqlx::query("SELECT * FROM payment_methods WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await
            .map_err(storage)?;
        row.as_ref().map(method_from_row).transpose()
    }

    async fn list_payment_methods(
        &self,
        active_only: bool,
    ) -> Result<Vec<PaymentMethod>, FundingError> {
        let sql = if active_only {
            "SELECT * FROM payment_methods WHERE is_active = 1 ORDER BY name"
        } else {
            "SELECT * FROM payment_methods ORDER BY name"
        };
        let rows = sqlx::query(sql)
            .fetch_all(self.db.pool())
            .await
            .map_err(storage)?;
        rows.iter().map(method_from_row).collect()
    }

    async fn create_deposit(&self, deposit: &Deposit) -> Result<(), FundingError> {
        sqlx::query(
            r#"
            INSERT INTO deposits (
                id, user_email, amount, currency, method_id, method_name, network,
                deposit_address, transaction_hash, processing_fee, network_fee, final_amount,
                status, admin_notes, approved_by, approved_at, rejected_by, rejected_at,
                expires_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&deposit.id)
        .bind(&deposit.user_email)
        .bind(deposit.amount.to_string())
        .bind(&deposit.currency)
        .bind(&deposit.method_id)
        .bind(&deposit.method_name)
        .bind(&deposit.network)
        .bind(&deposit.deposit_address)
        .bind(&deposit.transaction_hash)
        .bind(deposit.processing_fee.to_string())
        .bind(deposit.network_fee.to_string())
        .bind(deposit.final_amount.to_string())
        .bind(deposit.status.to_string())
        .bind(&deposit.admin_notes)
        .bind(&deposit.approved_by)
        .bind(deposit.approved_at.map(to_millis))
        .bind(&deposit.rejected_by)
        .bind(deposit.rejected_at.map(to_millis))
        .bind(to_millis(deposit.expires_at))
        .bind(to_millis(deposit.created_at))
        .bind(to_millis(deposit.updated_at))
        .execute(self.db.pool())
        .await
        .map_err(storage)?;
        info!(
            "Deposit request {} created for {}: {} {}",
            deposit.id, deposit.user_email, deposit.amount, deposit.currency
        );
        Ok(())
    }

    async fn get_deposit(&self, id: &str) -> Result<Option<Deposit>, FundingError> {
        let mut conn = self.db.pool().acquire().await.map_err(storage)?;
        fetch_deposit(&mut *conn, id).await
    }

    async fn list_user_deposits(
        &self,
        email: &str,
        page: Page,
    ) -> Result<Vec<Deposit>, FundingError> {
        let rows = sqlx::query(
            "SELECT * FROM deposits WHERE user_email = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
        )
        .bind(email)
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(self.db.pool())
        .await
        .map_err(storage)?;
        rows.iter().map(deposit_from_row).collect()
    }

    async fn list_deposits(
        &self,
        filter: &DepositFilter,
    ) -> Result<(Vec<Deposit>, bool), FundingError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM deposits WHERE 1 = 1");
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.to_string());
        }
        if let Some(network) = &filter.network {
            qb.push(" AND network = ").push_bind(network.clone());
        }
        if let Some(email) = &filter.user_email {
            qb.push(" AND LOWER(user_email) LIKE ")
                .push_bind(format!("%{}%", email.to_lowercase()));
        }
        if let Some(from) = filter.date_from {
            qb.push(" AND created_at >= ").push_bind(to_millis(from));
        }
        if let Some(to) = filter.date_to {
            qb.push(" AND created_at <= ").push_bind(to_millis(to));
        }
        // One extra row tells whether another page follows.
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(filter.page.limit) + 1)
            .push(" OFFSET ")
            .push_bind(i64::from(filter.page.offset));

        let rows = qb.build().fetch_all(self.db.pool()).await.map_err(storage)?;
        let mut deposits = rows
            .iter()
            .map(deposit_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        let limit = usize::try_from(filter.page.limit).unwrap_or(usize::MAX);
        let has_more = deposits.len() > limit;
        deposits.truncate(limit);
        Ok((deposits, has_more))
    }

    async fn deposit_stats(&self, day_start: DateTime<Utc>) -> Result<DepositStats, FundingError> {
        let rows = sqlx::query("SELECT status, amount, final_amount, created_at FROM deposits")
            .fetch_all(self.db.pool())
            .await
            .map_err(storage)?;

        let day_start = to_millis(day_start);
        let mut stats = DepositStats::default();
        for row in &rows {
            let status: DepositStatus = parse_enum(&col::<String>(row, "status")?).map_err(storage)?;
            let amount = dec(row, "amount")?;
            let final_amount = dec(row, "final_amount")?;
            let created_at: i64 = col(row, "created_at")?;

            stats.total += 1;
            if status == DepositStatus::Pending {
                stats.pending += 1;
                stats.pending_amount += amount;
            }
            if status.credits_wallet() {
                stats.approved += 1;
                stats.total_amount += if final_amount > Decimal::ZERO { final_amount } else { amount };
            }
            if created_at >= day_start {
                stats.deposits_today += 1;
            }
        }
        Ok(stats)
    }

    async fn review_deposit(
        &self,
        id: &str,
        decision: &ReviewDecision,
        now: DateTime<Utc>,
    ) -> Result<Deposit, FundingError> {
        let mut tx = self.db.pool().begin().await.map_err(storage)?;

        let mut deposit = fetch_deposit(&mut *tx, id)
            .await?
            .ok_or_else(|| FundingError::NotFound(format!("Deposit {}", id)))?;
        if deposit.status != DepositStatus::Pending {
            return Err(not_pending_deposit(&deposit));
        }
        let previous = deposit.status;

        if let Some(notes) = &decision.notes {
            deposit.admin_notes = Some(notes.clone());
        }
        if let Some(hash) = &decision.transaction_hash {
            deposit.transaction_hash = Some(hash.clone());
        }
        deposit.updated_at = now;

        let notification = match decision.action {
            ReviewAction::Approve => {
                deposit.status = DepositStatus::Approved;
                deposit.approved_by = Some(decision.admin_email.clone());
                deposit.approved_at = Some(now);
                let outcome = post_in_tx(&mut *tx, &[credit_posting(&deposit)], now).await?;
                if !outcome.applied {
                    tracing::warn!("Deposit {} was already credited, status updated only", deposit.id);
                }
                inbox(
                    &deposit.user_email,
                    "Deposit Approved",
                    format!(
                        "Your deposit of ${} has been approved and credited to your wallet.",
                        deposit.credit_amount()
                    ),
                    "deposit",
                    NotificationPriority::High,
                    now,
                )
            }
            ReviewAction::Reject => {
                deposit.status = DepositStatus::Rejected;
                deposit.rejected_by = Some(decision.admin_email.clone());
                deposit.rejected_at = Some(now);
                inbox(
                    &deposit.user_email,
                    "Deposit Rejected",
                    format!(
                        "Your deposit of ${} was rejected.{}",
                        deposit.amount,
                        decision
                            .notes
                            .as_deref()
                            .map(|n| format!(" Reason: {}", n))
                            .unwrap_or_default()
                    ),
                    "deposit",
                    NotificationPriority::High,
                    now,
                )
            }
        };

        update_deposit(&mut *tx, &deposit, previous).await?;
        notify_owner(&mut *tx, &notification).await?;
        tx.commit().await.map_err(storage)?;

        info!(
            "Deposit {} {} by {}",
            deposit.id, deposit.status, decision.admin_email
        );
        Ok(deposit)
    }

    async fn set_deposit_status(
        &self,
        id: &str,
        status: DepositStatus,
        admin_email: &str,
        notes: Option<String>,
        transaction_hash: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<DepositUpdate, FundingError> {
        if !status.is_admin_settable() {
            return Err(FundingError::Validation(format!(
                "Invalid status. Must be one of: pending, approved, rejected, completed, failed (got {})",
                status
            )));
        }

        let mut tx = self.db.pool().begin().await.map_err(storage)?;
        let mut deposit = fetch_deposit(&mut *tx, id)
            .await?
            .ok_or_else(|| FundingError::NotFound(format!("Deposit {}", id)))?;
        let previous = deposit.status;

        if previous.credits_wallet() && !status.credits_wallet() {
            return Err(not_pending_deposit(&deposit));
        }

        deposit.status = status;
        deposit.updated_at = now;
        if notes.is_some() {
            deposit.admin_notes = notes;
        }
        if transaction_hash.is_some() {
            deposit.transaction_hash = transaction_hash;
        }

        let mut credited = false;
        let mut notification = None;
        if status.credits_wallet() {
            if deposit.approved_by.is_none() {
                deposit.approved_by = Some(admin_email.to_string());
                deposit.approved_at = Some(now);
            }
            credited = post_in_tx(&mut *tx, &[credit_posting(&deposit)], now)
                .await?
                .applied;
            if credited {
                notification = Some(inbox(
                    &deposit.user_email,
                    "Deposit Approved",
                    format!(
                        "Your deposit of ${} has been credited to your wallet.",
                        deposit.credit_amount()
                    ),
                    "deposit",
                    NotificationPriority::High,
                    now,
                ));
            }
        } else if matches!(status, DepositStatus::Rejected | DepositStatus::Failed) {
            deposit.rejected_by = Some(admin_email.to_string());
            deposit.rejected_at = Some(now);
            notification = Some(inbox(
                &deposit.user_email,
                "Deposit Rejected",
                format!("Your deposit of ${} was marked {}.", deposit.amount, status),
                "deposit",
                NotificationPriority::High,
                now,
            ));
        }

        update_deposit(&mut *tx, &deposit, previous).await?;
        if let Some(n) = &notification {
            notify_owner(&mut *tx, n).await?;
        }
        tx.commit().await.map_err(storage)?;

        info!(
            "Deposit {} moved {} -> {} by {} (credited: {})",
            deposit.id, previous, status, admin_email, credited
        );
        Ok(DepositUpdate { deposit, credited })
    }

    async fn delete_deposit(&self, id: &str) -> Result<Deposit, FundingError> {
        let mut tx = self.db.pool().begin().await.map_err(storage)?;
        let deposit = fetch_deposit(&mut *tx, id)
            .await?
            .ok_or_else(|| FundingError::NotFound(format!("Deposit {}", id)))?;

        let posted = is_posted(&mut *tx, &deposit.credit_transaction_id(), &deposit.user_email)
            .await
            .map_err(storage)?;
        if deposit.status.credits_wallet() || posted {
            return Err(FundingError::InvalidState {
                kind: "Deposit",
                id: deposit.id.clone(),
                status: "credited".to_string(),
            });
        }

        sqlx::query("DELETE FROM deposits WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        tx.commit().await.map_err(storage)?;
        info!("Deleted deposit {} of {}", deposit.id, deposit.user_email);
        Ok(deposit)
    }

    async fn create_withdrawal(&self, withdrawal: &Withdrawal) -> Result<(), FundingError> {
        let mut tx = self.db.pool().begin().await.map_err(storage)?;

        sqlx::query(
            r#"
            INSERT INTO withdrawals (
                id, user_email, method_id, method_name, network, destination_address, amount,
                currency, processing_fee, network_fee, final_amount, status, admin_notes,
                transaction_hash, processed_by, processed_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&withdrawal.id)
        .bind(&withdrawal.user_email)
        .bind(&withdrawal.method_id)
        .bind(&withdrawal.method_name)
        .bind(&withdrawal.network)
        .bind(&withdrawal.destination_address)
        .bind(withdrawal.amount.to_string())
        .bind(&withdrawal.currency)
        .bind(withdrawal.processing_fee.to_string())
        .bind(withdrawal.network_fee.to_string())
        .bind(withdrawal.final_amount.to_string())
        .bind(withdrawal.status.to_string())
        .bind(&withdrawal.admin_notes)
        .bind(&withdrawal.transaction_hash)
        .bind(&withdrawal.processed_by)
        .bind(withdrawal.processed_at.map(to_millis))
        .bind(to_millis(withdrawal.created_at))
        .bind(to_millis(withdrawal.updated_at))
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        let hold = Posting::new(
            withdrawal.user_email.clone(),
            withdrawal.hold_transaction_id(),
            TransactionKind::Withdrawal,
            format!("Withdrawal request via {}", withdrawal.method_name),
        )
        .with_change(BalanceChange::debit(WalletAccount::Total, withdrawal.amount))
        .with_reference(withdrawal.id.clone())
        .with_metadata(serde_json::json!({
            "destination_address": withdrawal.destination_address,
            "network": withdrawal.network,
            "final_amount": withdrawal.final_amount,
        }));
        post_in_tx(&mut *tx, &[hold], withdrawal.created_at).await?;

        tx.commit().await.map_err(storage)?;
        info!(
            "Withdrawal {} created for {}: {} held",
            withdrawal.id, withdrawal.user_email, withdrawal.amount
        );
        Ok(())
    }

    async fn get_withdrawal(&self, id: &str) -> Result<Option<Withdrawal>, FundingError> {
        let mut conn = self.db.pool().acquire().await.map_err(storage)?;
        fetch_withdrawal(&mut *conn, id).await
    }

    async fn list_user_withdrawals(
        &self,
        email: &str,
        page: Page,
    ) -> Result<Vec<Withdrawal>, FundingError> {
        let rows = sqlx::query(
            "SELECT * FROM withdrawals WHERE user_email = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
        )
        .bind(email)
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(self.db.pool())
        .await
        .map_err(storage)?;
        rows.iter().map(withdrawal_from_row).collect()
    }

    async fn list_withdrawals(
        &self,
        status: Option<WithdrawalStatus>,
        page: Page,
    ) -> Result<Vec<Withdrawal>, FundingError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM withdrawals");
        if let Some(status) = status {
            qb.push(" WHERE status = ").push_bind(status.to_string());
        }
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(page.offset));

        let rows = qb.build().fetch_all(self.db.pool()).await.map_err(storage)?;
        rows.iter().map(withdrawal_from_row).collect()
    }

    async fn withdrawal_stats(&self, email: &str) -> Result<WithdrawalStats, FundingError> {
        let rows = sqlx::query("SELECT status, amount FROM withdrawals WHERE user_email = ?")
            .bind(email)
            .fetch_all(self.db.pool())
            .await
            .map_err(storage)?;

        let mut stats = WithdrawalStats::default();
        for row in &rows {
            let status: WithdrawalStatus =
                parse_enum(&col::<String>(row, "status")?).map_err(storage)?;
            stats.total += 1;
            match status {
                WithdrawalStatus::Pending => stats.pending += 1,
                WithdrawalStatus::Completed => {
                    stats.completed += 1;
                    stats.total_withdrawn += dec(row, "amount")?;
                }
                WithdrawalStatus::Approved => stats.total_withdrawn += dec(row, "amount")?,
                WithdrawalStatus::Rejected | WithdrawalStatus::Cancelled => {}
            }
        }
        Ok(stats)
    }

    async fn review_withdrawal(
        &self,
        id: &str,
        decision: &ReviewDecision,
        now: DateTime<Utc>,
    ) -> Result<Withdrawal, FundingError> {
        let mut tx = self.db.pool().begin().await.map_err(storage)?;

        let mut withdrawal = fetch_withdrawal(&mut *tx, id)
            .await?
            .ok_or_else(|| FundingError::NotFound(format!("Withdrawal {}", id)))?;
        if withdrawal.status != WithdrawalStatus::Pending {
            return Err(not_pending_withdrawal(&withdrawal));
        }
        let previous = withdrawal.status;

        withdrawal.processed_by = Some(decision.admin_email.clone());
        withdrawal.processed_at = Some(now);
        withdrawal.updated_at = now;
        if let Some(notes) = &decision.notes {
            withdrawal.admin_notes = Some(notes.clone());
        }

        let notification = match decision.action {
            ReviewAction::Approve => {
                withdrawal.status = WithdrawalStatus::Approved;
                if let Some(hash) = &decision.transaction_hash {
                    withdrawal.transaction_hash = Some(hash.clone());
                }
                inbox(
                    &withdrawal.user_email,
                    "Withdrawal Approved",
                    format!(
                        "Your withdrawal of ${} has been approved. ${} will be sent to {}.",
                        withdrawal.amount, withdrawal.final_amount, withdrawal.destination_address
                    ),
                    "withdrawal",
                    NotificationPriority::High,
                    now,
                )
            }
            ReviewAction::Reject => {
                withdrawal.status = WithdrawalStatus::Rejected;
                let refund = refund_posting(&withdrawal, "Refund for rejected withdrawal");
                post_in_tx(&mut *tx, &[refund], now).await?;
                inbox(
                    &withdrawal.user_email,
                    "Withdrawal Rejected",
                    format!(
                        "Your withdrawal of ${} was rejected and the amount returned to your wallet.",
                        withdrawal.amount
                    ),
                    "withdrawal",
                    NotificationPriority::High,
                    now,
                )
            }
        };

        update_withdrawal(&mut *tx, &withdrawal, previous).await?;
        notify_owner(&mut *tx, &notification).await?;
        tx.commit().await.map_err(storage)?;

        info!(
            "Withdrawal {} {} by {}",
            withdrawal.id, withdrawal.status, decision.admin_email
        );
        Ok(withdrawal)
    }

    async fn complete_withdrawal(
        &self,
        id: &str,
        admin_email: &str,
        transaction_hash: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Withdrawal, FundingError> {
        let mut tx = self.db.pool().begin().await.map_err(storage)?;

        let mut withdrawal = fetch_withdrawal(&mut *tx, id)
            .await?
            .ok_or_else(|| FundingError::NotFound(format!("Withdrawal {}", id)))?;
        if withdrawal.status != WithdrawalStatus::Approved {
            return Err(not_pending_withdrawal(&withdrawal));
        }

        withdrawal.status = WithdrawalStatus::Completed;
        withdrawal.processed_by = Some(admin_email.to_string());
        withdrawal.processed_at = Some(now);
        withdrawal.updated_at = now;
        if transaction_hash.is_some() {
            withdrawal.transaction_hash = transaction_hash;
        }

        let notification = inbox(
            &withdrawal.user_email,
            "Withdrawal Completed",
            format!(
                "${} has been sent to {}.",
                withdrawal.final_amount, withdrawal.destination_address
            ),
            "withdrawal",
            NotificationPriority::Medium,
            now,
        );
        update_withdrawal(&mut *tx, &withdrawal, WithdrawalStatus::Approved).await?;
        notify_owner(&mut *tx, &notification).await?;
        tx.commit().await.map_err(storage)?;

        info!("Withdrawal {} completed by {}", withdrawal.id, admin_email);
        Ok(withdrawal)
    }

    async fn cancel_withdrawal(
        &self,
        id: &str,
        user_email: &str,
        now: DateTime<Utc>,
    ) -> Result<Withdrawal, FundingError> {
        let mut tx = self.db.pool().begin().await.map_err(storage)?;

        let mut withdrawal = fetch_withdrawal(&mut *tx, id)
            .await?
            .filter(|w| w.user_email == user_email)
            .ok_or_else(|| FundingError::NotFound(format!("Withdrawal {}", id)))?;
        if withdrawal.status != WithdrawalStatus::Pending {
            return Err(not_pending_withdrawal(&withdrawal));
        }
        let previous = withdrawal.status;

        withdrawal.status = WithdrawalStatus::Cancelled;
        withdrawal.updated_at = now;
        let refund = refund_posting(&withdrawal, "Refund for cancelled withdrawal");
        post_in_tx(&mut *tx, &[refund], now).await?;
        update_withdrawal(&mut *tx, &withdrawal, previous).await?;
        tx.commit().await.map_err(storage)?;

        info!("Withdrawal {} cancelled by {}", withdrawal.id, user_email);
        Ok(withdrawal)
    }
}
