use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tic_core::store::error::StoreError;

/// Database file name inside the data root.
const DEFAULT_DB_FILE: &str = "tic.db";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    email TEXT PRIMARY KEY,
    password_hash TEXT NOT NULL,
    first_name TEXT,
    last_name TEXT,
    date_of_birth TEXT,
    country TEXT,
    country_of_birth TEXT,
    gender TEXT,
    address TEXT,
    phone TEXT,
    email_verified INTEGER NOT NULL DEFAULT 0,
    phone_verified INTEGER NOT NULL DEFAULT 0,
    identity_status TEXT NOT NULL DEFAULT 'not_submitted',
    profile_completed INTEGER NOT NULL DEFAULT 0,
    role TEXT NOT NULL DEFAULT 'user',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS verification_codes (
    channel TEXT NOT NULL,
    target TEXT NOT NULL,
    user_email TEXT NOT NULL,
    code TEXT NOT NULL,
    expires_at INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    PRIMARY KEY (channel, target)
);

CREATE TABLE IF NOT EXISTS password_reset_tokens (
    token TEXT PRIMARY KEY,
    email TEXT NOT NULL,
    expires_at INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS wallets (
    user_email TEXT PRIMARY KEY,
    total_balance TEXT NOT NULL DEFAULT '0',
    tic_balance TEXT NOT NULL DEFAULT '0',
    gic_balance TEXT NOT NULL DEFAULT '0',
    staking_balance TEXT NOT NULL DEFAULT '0',
    partner_wallet_balance TEXT NOT NULL DEFAULT '0',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS wallet_transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    transaction_id TEXT NOT NULL,
    user_email TEXT NOT NULL,
    kind TEXT NOT NULL,
    account TEXT NOT NULL,
    amount TEXT NOT NULL,
    balance_before TEXT NOT NULL,
    balance_after TEXT NOT NULL,
    description TEXT NOT NULL,
    reference_id TEXT,
    metadata TEXT NOT NULL DEFAULT 'null',
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_wallet_tx_owner ON wallet_transactions (user_email, id);
CREATE INDEX IF NOT EXISTS idx_wallet_tx_txid ON wallet_transactions (transaction_id, user_email);

CREATE TABLE IF NOT EXISTS payment_methods (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    network TEXT NOT NULL,
    currency TEXT NOT NULL,
    deposit_address TEXT,
    min_amount TEXT NOT NULL,
    max_amount TEXT NOT NULL,
    processing_fee_rate TEXT NOT NULL,
    fixed_fee TEXT NOT NULL,
    network_fee TEXT NOT NULL,
    is_active INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS deposits (
    id TEXT PRIMARY KEY,
    user_email TEXT NOT NULL,
    amount TEXT NOT NULL,
    currency TEXT NOT NULL,
    method_id TEXT NOT NULL,
    method_name TEXT NOT NULL,
    network TEXT NOT NULL,
    deposit_address TEXT,
    transaction_hash TEXT,
    processing_fee TEXT NOT NULL,
    network_fee TEXT NOT NULL,
    final_amount TEXT NOT NULL,
    status TEXT NOT NULL,
    admin_notes TEXT,
    approved_by TEXT,
    approved_at INTEGER,
    rejected_by TEXT,
    rejected_at INTEGER,
    expires_at INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_deposits_owner ON deposits (user_email, created_at);
CREATE INDEX IF NOT EXISTS idx_deposits_status ON deposits (status, created_at);

CREATE TABLE IF NOT EXISTS withdrawals (
    id TEXT PRIMARY KEY,
    user_email TEXT NOT NULL,
    method_id TEXT NOT NULL,
    method_name TEXT NOT NULL,
    network TEXT NOT NULL,
    destination_address TEXT NOT NULL,
    amount TEXT NOT NULL,
    currency TEXT NOT NULL,
    processing_fee TEXT NOT NULL,
    network_fee TEXT NOT NULL,
    final_amount TEXT NOT NULL,
    status TEXT NOT NULL,
    admin_notes TEXT,
    transaction_hash TEXT,
    processed_by TEXT,
    processed_at INTEGER,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_withdrawals_owner ON withdrawals (user_email, created_at);

CREATE TABLE IF NOT EXISTS referral_codes (
    code TEXT PRIMARY KEY,
    user_email TEXT NOT NULL UNIQUE,
    link TEXT NOT NULL,
    total_referrals INTEGER NOT NULL DEFAULT 0,
    total_earnings TEXT NOT NULL DEFAULT '0',
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS referrals (
    referred_email TEXT PRIMARY KEY,
    referrer_email TEXT NOT NULL,
    referral_code TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_referrals_referrer ON referrals (referrer_email);

CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY,
    user_email TEXT NOT NULL,
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    kind TEXT NOT NULL,
    priority TEXT NOT NULL,
    is_read INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_notifications_owner ON notifications (user_email, created_at);

CREATE TABLE IF NOT EXISTS subscriptions (
    id TEXT PRIMARY KEY,
    user_email TEXT NOT NULL,
    plan_id TEXT NOT NULL,
    plan_name TEXT NOT NULL,
    status TEXT NOT NULL,
    start_date INTEGER NOT NULL,
    end_date INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS token_distributions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    subscription_id TEXT NOT NULL,
    user_email TEXT NOT NULL,
    distribution_date TEXT NOT NULL,
    token_amount TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    UNIQUE (subscription_id, distribution_date)
);
CREATE INDEX IF NOT EXISTS idx_token_distributions_owner ON token_distributions (user_email, distribution_date);

CREATE TABLE IF NOT EXISTS payment_plans (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    price TEXT NOT NULL,
    currency TEXT NOT NULL,
    duration_days INTEGER NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    sort_order INTEGER NOT NULL DEFAULT 0
);
INSERT OR IGNORE INTO payment_plans (id, name, description, price, currency, duration_days, is_active, sort_order)
VALUES
    ('starter', 'Starter Plan', '500 TIC tokens over one year', '10', 'USD', 365, 1, 1),
    ('vip', 'VIP Plan', '6900 TIC tokens over one year with the full referral programme', '138', 'USD', 365, 1, 2);

CREATE TABLE IF NOT EXISTS payment_transactions (
    id TEXT PRIMARY KEY,
    user_email TEXT NOT NULL,
    plan_id TEXT NOT NULL,
    plan_name TEXT NOT NULL,
    amount TEXT NOT NULL,
    currency TEXT NOT NULL,
    balance_before TEXT NOT NULL,
    balance_after TEXT NOT NULL,
    subscription_id TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_payment_transactions_owner ON payment_transactions (user_email, created_at);

CREATE TABLE IF NOT EXISTS commission_earnings (
    id TEXT PRIMARY KEY,
    earner_email TEXT NOT NULL,
    referred_email TEXT NOT NULL,
    level INTEGER NOT NULL,
    kind TEXT NOT NULL,
    rate TEXT NOT NULL,
    base_amount TEXT NOT NULL,
    amount TEXT NOT NULL,
    source_id TEXT NOT NULL,
    earning_date TEXT NOT NULL,
    description TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    UNIQUE (earner_email, referred_email, kind, source_id)
);
CREATE INDEX IF NOT EXISTS idx_commission_earnings_owner ON commission_earnings (earner_email, created_at);
CREATE INDEX IF NOT EXISTS idx_commission_earnings_date ON commission_earnings (earning_date);
"#;

/// # Summary
/// Handle to the platform's SQLite database.
///
/// # Invariants
/// * The pool has a single connection: every write transaction is
///   serialized, so read-modify-write sequences on balances cannot
///   interleave.
/// * The schema is created when the handle is opened.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens `tic.db` under the configured root dir (see [`crate::config`]).
    pub async fn open() -> Result<Self, StoreError> {
        Self::open_at(&crate::config::get_root_dir()).await
    }

    /// # Summary
    /// Opens (creating if needed) `tic.db` inside `dir` and applies the schema.
    ///
    /// # Logic
    /// 1. Creates `dir`.
    /// 2. Connects in WAL mode with a busy timeout and a single connection.
    /// 3. Runs the idempotent DDL batch.
    pub async fn open_at(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir).map_err(|e| StoreError::InitError(e.to_string()))?;

        let options = SqliteConnectOptions::new()
            .filename(dir.join(DEFAULT_DB_FILE))
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::InitError(e.to_string()))?;

        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| StoreError::InitError(e.to_string()))?;

        tracing::info!("SQLite database ready at {}", dir.join(DEFAULT_DB_FILE).display());
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Maps a driver error, recognising unique-constraint violations.
pub(crate) fn db_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e
        && db.is_unique_violation()
    {
        return StoreError::Duplicate(db.message().to_string());
    }
    StoreError::Database(e.to_string())
}

pub(crate) fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Database(format!("Invalid timestamp: {}", ms)))
}

pub(crate) fn opt_from_millis(ms: Option<i64>) -> Result<Option<DateTime<Utc>>, StoreError> {
    ms.map(from_millis).transpose()
}

pub(crate) fn parse_decimal(raw: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str(raw).map_err(|e| StoreError::Database(format!("Invalid decimal '{}': {}", raw, e)))
}

pub(crate) fn parse_enum<T: FromStr<Err = String>>(raw: &str) -> Result<T, StoreError> {
    raw.parse::<T>().map_err(StoreError::Database)
}
