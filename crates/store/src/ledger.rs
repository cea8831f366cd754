use crate::db::{from_millis, parse_decimal, parse_enum, to_millis};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tic_core::store::error::StoreError;
use tic_core::wallet::entity::{PostOutcome, Posting, Wallet, WalletTransaction};
use tic_core::wallet::error::WalletError;

pub(crate) fn wallet_err(e: impl std::fmt::Display) -> WalletError {
    WalletError::Storage(e.to_string())
}

pub(crate) fn wallet_from_row(row: &SqliteRow) -> Result<Wallet, StoreError> {
    let text = |col: &str| -> Result<Decimal, StoreError> {
        let raw: String = row.try_get(col).map_err(|e| StoreError::Database(e.to_string()))?;
        parse_decimal(&raw)
    };
    let millis = |col: &str| -> Result<DateTime<Utc>, StoreError> {
        let raw: i64 = row.try_get(col).map_err(|e| StoreError::Database(e.to_string()))?;
        from_millis(raw)
    };
    Ok(Wallet {
        user_email: row.try_get("user_email").map_err(|e| StoreError::Database(e.to_string()))?,
        total_balance: text("total_balance")?,
        tic_balance: text("tic_balance")?,
        gic_balance: text("gic_balance")?,
        staking_balance: text("staking_balance")?,
        partner_wallet_balance: text("partner_wallet_balance")?,
        created_at: millis("created_at")?,
        updated_at: millis("updated_at")?,
    })
}

pub(crate) fn transaction_from_row(row: &SqliteRow) -> Result<WalletTransaction, StoreError> {
    let get_str = |col: &str| -> Result<String, StoreError> {
        row.try_get(col).map_err(|e| StoreError::Database(e.to_string()))
    };
    let metadata_raw = get_str("metadata")?;
    let created_at: i64 = row.try_get("created_at").map_err(|e| StoreError::Database(e.to_string()))?;
    Ok(WalletTransaction {
        transaction_id: get_str("transaction_id")?,
        user_email: get_str("user_email")?,
        kind: parse_enum(&get_str("kind")?)?,
        account: parse_enum(&get_str("account")?)?,
        amount: parse_decimal(&get_str("amount")?)?,
        balance_before: parse_decimal(&get_str("balance_before")?)?,
        balance_after: parse_decimal(&get_str("balance_after")?)?,
        description: get_str("description")?,
        reference_id: row.try_get("reference_id").map_err(|e| StoreError::Database(e.to_string()))?,
        metadata: serde_json::from_str(&metadata_raw).unwrap_or(serde_json::Value::Null),
        created_at: from_millis(created_at)?,
    })
}

/// Loads `email`'s wallet inside the open transaction, inserting an empty
/// one first if needed.
pub(crate) async fn load_or_create_wallet(
    conn: &mut SqliteConnection,
    email: &str,
    now: DateTime<Utc>,
) -> Result<Wallet, StoreError> {
    sqlx::query(
        "INSERT OR IGNORE INTO wallets (user_email, created_at, updated_at) VALUES (?, ?, ?)",
    )
    .bind(email)
    .bind(to_millis(now))
    .bind(to_millis(now))
    .execute(&mut *conn)
    .await
    .map_err(crate::db::db_err)?;

    let row = sqlx::query("SELECT * FROM wallets WHERE user_email = ?")
        .bind(email)
        .fetch_one(&mut *conn)
        .await
        .map_err(crate::db::db_err)?;
    wallet_from_row(&row)
}

async fn write_wallet(conn: &mut SqliteConnection, wallet: &Wallet) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        UPDATE wallets
        SET total_balance = ?, tic_balance = ?, gic_balance = ?, staking_balance = ?,
            partner_wallet_balance = ?, updated_at = ?
        WHERE user_email = ?
        "#,
    )
    .bind(wallet.total_balance.to_string())
    .bind(wallet.tic_balance.to_string())
    .bind(wallet.gic_balance.to_string())
    .bind(wallet.staking_balance.to_string())
    .bind(wallet.partner_wallet_balance.to_string())
    .bind(to_millis(wallet.updated_at))
    .bind(&wallet.user_email)
    .execute(&mut *conn)
    .await
    .map_err(crate::db::db_err)?;
    Ok(())
}

async fn insert_ledger_row(conn: &mut SqliteConnection, tx: &WalletTransaction) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO wallet_transactions (
            transaction_id, user_email, kind, account, amount, balance_before,
            balance_after, description, reference_id, metadata, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&tx.transaction_id)
    .bind(&tx.user_email)
    .bind(tx.kind.to_string())
    .bind(tx.account.to_string())
    .bind(tx.amount.to_string())
    .bind(tx.balance_before.to_string())
    .bind(tx.balance_after.to_string())
    .bind(&tx.description)
    .bind(&tx.reference_id)
    .bind(tx.metadata.to_string())
    .bind(to_millis(tx.created_at))
    .execute(&mut *conn)
    .await
    .map_err(crate::db::db_err)?;
    Ok(())
}

/// Whether a ledger row for `(transaction_id, user_email)` exists.
pub(crate) async fn is_posted(
    conn: &mut SqliteConnection,
    transaction_id: &str,
    user_email: &str,
) -> Result<bool, StoreError> {
    let hit: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM wallet_transactions WHERE transaction_id = ? AND user_email = ? LIMIT 1",
    )
    .bind(transaction_id)
    .bind(user_email)
    .fetch_optional(&mut *conn)
    .await
    .map_err(crate::db::db_err)?;
    Ok(hit.is_some())
}

/// # Summary
/// Applies `postings` on an already open transaction. Shared by every store
/// that moves money, so the caller's own row changes commit with the
/// balance changes.
///
/// # Logic
/// 1. Any posting already in the ledger turns the whole batch into a no-op.
/// 2. For each posting: load (or create) the wallet, apply each change in
///    order, reject a slot going negative, write one ledger row per change.
/// 3. Persist the new balances.
///
/// # Returns
/// * `Err(InsufficientBalance)` leaves the transaction dirty; the caller
///   must drop it without committing.
pub(crate) async fn post_in_tx(
    conn: &mut SqliteConnection,
    postings: &[Posting],
    now: DateTime<Utc>,
) -> Result<PostOutcome, WalletError> {
    for posting in postings {
        if is_posted(conn, &posting.transaction_id, &posting.user_email)
            .await
            .map_err(wallet_err)?
        {
            tracing::debug!(
                "Posting {} for {} already recorded, skipping batch",
                posting.transaction_id,
                posting.user_email
            );
            return Ok(PostOutcome {
                applied: false,
                wallets: Vec::new(),
                transactions: Vec::new(),
            });
        }
    }

    let mut wallets = Vec::with_capacity(postings.len());
    let mut transactions = Vec::new();

    for posting in postings {
        let mut wallet = load_or_create_wallet(conn, &posting.user_email, now)
            .await
            .map_err(wallet_err)?;

        for change in &posting.changes {
            let before = wallet.balance(change.account);
            let after = before + change.delta;
            if after < Decimal::ZERO {
                return Err(WalletError::InsufficientBalance {
                    account: change.account,
                    required: -change.delta,
                    available: before,
                });
            }
            *wallet.balance_mut(change.account) = after;

            let row = WalletTransaction {
                transaction_id: posting.transaction_id.clone(),
                user_email: posting.user_email.clone(),
                kind: posting.kind,
                account: change.account,
                amount: change.delta,
                balance_before: before,
                balance_after: after,
                description: posting.description.clone(),
                reference_id: posting.reference_id.clone(),
                metadata: posting.metadata.clone(),
                created_at: now,
            };
            insert_ledger_row(conn, &row).await.map_err(wallet_err)?;
            transactions.push(row);
        }

        wallet.updated_at = now;
        write_wallet(conn, &wallet).await.map_err(wallet_err)?;
        wallets.push(wallet);
    }

    Ok(PostOutcome {
        applied: true,
        wallets,
        transactions,
    })
}
