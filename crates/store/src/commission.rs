use crate::db::{Database, db_err, from_millis, parse_decimal, parse_enum, to_millis};
use crate::ledger::post_in_tx;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use std::collections::HashMap;
use tic_core::commission::entity::{
    CommissionEarning, CommissionFilter, CommissionKind, CommissionSummary, NetworkMember,
    UnilevelReport,
};
use tic_core::commission::port::CommissionStore;
use tic_core::commission::rules::COMMISSION_PLAN_ID;
use tic_core::common::Page;
use tic_core::distribution::entity::CreditOutcome;
use tic_core::store::error::StoreError;
use tic_core::wallet::entity::{BalanceChange, Posting, TransactionKind, WalletAccount};
use tic_core::wallet::error::WalletError;
use tracing::info;

pub struct SqliteCommissionStore {
    db: Database,
}

impl SqliteCommissionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_day(raw: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| StoreError::Database(format!("Invalid date '{}': {}", raw, e)))
}

fn level_from(raw: i64) -> u32 {
    u32::try_from(raw).unwrap_or_default()
}

fn earning_from_row(row: &SqliteRow) -> Result<CommissionEarning, StoreError> {
    let text = |col: &str| -> Result<String, StoreError> { row.try_get(col).map_err(db_err) };
    let level: i64 = row.try_get("level").map_err(db_err)?;
    let created_at: i64 = row.try_get("created_at").map_err(db_err)?;
    Ok(CommissionEarning {
        id: text("id")?,
        earner_email: text("earner_email")?,
        referred_email: text("referred_email")?,
        level: level_from(level),
        kind: parse_enum(&text("kind")?)?,
        rate: parse_decimal(&text("rate")?)?,
        base_amount: parse_decimal(&text("base_amount")?)?,
        amount: parse_decimal(&text("amount")?)?,
        source_id: text("source_id")?,
        earning_date: parse_day(&text("earning_date")?)?,
        description: text("description")?,
        created_at: from_millis(created_at)?,
    })
}

/// Referrers above `email`, nearest first, at most `depth` of them.
pub(crate) async fn upline_in(
    conn: &mut SqliteConnection,
    email: &str,
    depth: u32,
) -> Result<Vec<String>, StoreError> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        WITH RECURSIVE upline(email, level) AS (
            SELECT referrer_email, 1 FROM referrals WHERE referred_email = ?
            UNION ALL
            SELECT r.referrer_email, u.level + 1
            FROM referrals r JOIN upline u ON r.referred_email = u.email
            WHERE u.level < ?
        )
        SELECT email, level FROM upline ORDER BY level
        "#,
    )
    .bind(email)
    .bind(i64::from(depth))
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err)?;
    Ok(rows.into_iter().map(|(email, _)| email).collect())
}

/// # Summary
/// Inserts `earning` and credits the earner's partner wallet on an open
/// transaction.
///
/// # Logic
/// 1. `INSERT OR IGNORE` on the unique source key; an ignored insert means
///    the commission was already paid.
/// 2. Posts a `commission` credit on the `partner_wallet` slot.
/// 3. Adds the amount to the earner's referral `total_earnings`.
pub(crate) async fn credit_in(
    conn: &mut SqliteConnection,
    earning: &CommissionEarning,
    now: DateTime<Utc>,
) -> Result<CreditOutcome, StoreError> {
    let inserted = sqlx::query(
        r#"
        INSERT OR IGNORE INTO commission_earnings (
            id, earner_email, referred_email, level, kind, rate, base_amount, amount,
            source_id, earning_date, description, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&earning.id)
    .bind(&earning.earner_email)
    .bind(&earning.referred_email)
    .bind(i64::from(earning.level))
    .bind(earning.kind.to_string())
    .bind(earning.rate.to_string())
    .bind(earning.base_amount.to_string())
    .bind(earning.amount.to_string())
    .bind(&earning.source_id)
    .bind(day_key(earning.earning_date))
    .bind(&earning.description)
    .bind(to_millis(earning.created_at))
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;
    if inserted.rows_affected() == 0 {
        return Ok(CreditOutcome::AlreadyDistributed);
    }

    let posting = Posting::new(
        earning.earner_email.clone(),
        format!("commission_{}", earning.id),
        TransactionKind::Commission,
        earning.description.clone(),
    )
    .with_change(BalanceChange::credit(WalletAccount::Partner, earning.amount))
    .with_reference(earning.referred_email.clone())
    .with_metadata(serde_json::json!({
        "commission_type": earning.kind.to_string(),
        "level": earning.level,
        "rate": earning.rate.to_string(),
        "source_id": earning.source_id,
    }));
    post_in_tx(&mut *conn, &[posting], now)
        .await
        .map_err(|e: WalletError| StoreError::Database(e.to_string()))?;

    // Earners without a code yet have no counter to bump.
    let current: Option<String> =
        sqlx::query_scalar("SELECT total_earnings FROM referral_codes WHERE user_email = ?")
            .bind(&earning.earner_email)
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_err)?;
    if let Some(raw) = current {
        let total = parse_decimal(&raw)? + earning.amount;
        sqlx::query("UPDATE referral_codes SET total_earnings = ? WHERE user_email = ?")
            .bind(total.to_string())
            .bind(&earning.earner_email)
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
    }
    Ok(CreditOutcome::Credited)
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, earner_email: &str, filter: &CommissionFilter) {
    qb.push(" WHERE earner_email = ");
    qb.push_bind(earner_email.to_string());
    if let Some(kind) = filter.kind {
        qb.push(" AND kind = ");
        qb.push_bind(kind.to_string());
    }
    if let Some(from) = filter.date_from {
        qb.push(" AND earning_date >= ");
        qb.push_bind(day_key(from));
    }
    if let Some(to) = filter.date_to {
        qb.push(" AND earning_date <= ");
        qb.push_bind(day_key(to));
    }
}

#[async_trait]
impl CommissionStore for SqliteCommissionStore {
    async fn downline(&self, email: &str, depth: u32) -> Result<Vec<NetworkMember>, StoreError> {
        // Bare columns next to MIN() come from the row holding the minimum.
        let rows = sqlx::query(
            r#"
            WITH RECURSIVE network(email, referrer_email, referral_code, joined_at, level) AS (
                SELECT referred_email, referrer_email, referral_code, created_at, 1
                FROM referrals WHERE referrer_email = ?
                UNION
                SELECT r.referred_email, r.referrer_email, r.referral_code, r.created_at, n.level + 1
                FROM referrals r JOIN network n ON r.referrer_email = n.email
                WHERE n.level < ?
            )
            SELECT email, referrer_email, referral_code, joined_at, MIN(level) AS level
            FROM network
            WHERE email <> ?
            GROUP BY email
            ORDER BY level, joined_at
            "#,
        )
        .bind(email)
        .bind(i64::from(depth))
        .bind(email)
        .fetch_all(self.db.pool())
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|row| {
                let level: i64 = row.try_get("level").map_err(db_err)?;
                let joined_at: i64 = row.try_get("joined_at").map_err(db_err)?;
                Ok(NetworkMember {
                    email: row.try_get("email").map_err(db_err)?,
                    level: level_from(level),
                    referrer_email: row.try_get("referrer_email").map_err(db_err)?,
                    referral_code: row.try_get("referral_code").map_err(db_err)?,
                    joined_at: from_millis(joined_at)?,
                })
            })
            .collect()
    }

    async fn referrers(&self) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar(
            "SELECT referrer_email FROM referrals GROUP BY referrer_email ORDER BY MIN(created_at)",
        )
        .fetch_all(self.db.pool())
        .await
        .map_err(db_err)
    }

    async fn active_vip_counts(&self, now: DateTime<Utc>) -> Result<HashMap<String, u32>, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT user_email, COUNT(*) FROM subscriptions
            WHERE plan_id = ? AND status = 'active' AND end_date >= ?
            GROUP BY user_email
            "#,
        )
        .bind(COMMISSION_PLAN_ID)
        .bind(to_millis(now))
        .fetch_all(self.db.pool())
        .await
        .map_err(db_err)?;
        Ok(rows
            .into_iter()
            .map(|(email, count)| (email, u32::try_from(count).unwrap_or(u32::MAX)))
            .collect())
    }

    async fn credit(
        &self,
        earning: &CommissionEarning,
        now: DateTime<Utc>,
    ) -> Result<CreditOutcome, StoreError> {
        let mut tx = self.db.pool().begin().await.map_err(db_err)?;
        let outcome = credit_in(&mut *tx, earning, now).await?;
        tx.commit().await.map_err(db_err)?;
        if outcome == CreditOutcome::Credited {
            info!(
                "Commission {} USD ({}, level {}) credited to {}",
                earning.amount, earning.kind, earning.level, earning.earner_email
            );
        }
        Ok(outcome)
    }

    async fn list_commissions(
        &self,
        earner_email: &str,
        filter: &CommissionFilter,
        page: Page,
    ) -> Result<(Vec<CommissionEarning>, bool), StoreError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM commission_earnings");
        push_filter(&mut qb, earner_email, filter);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(i64::from(page.limit) + 1);
        qb.push(" OFFSET ");
        qb.push_bind(i64::from(page.offset));

        let rows = qb.build().fetch_all(self.db.pool()).await.map_err(db_err)?;
        let mut earnings = rows.iter().map(earning_from_row).collect::<Result<Vec<_>, _>>()?;
        let has_more = earnings.len() > usize::try_from(page.limit).unwrap_or(usize::MAX);
        earnings.truncate(usize::try_from(page.limit).unwrap_or(usize::MAX));
        Ok((earnings, has_more))
    }

    async fn summary(&self, earner_email: &str) -> Result<CommissionSummary, StoreError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT kind, amount FROM commission_earnings WHERE earner_email = ?")
                .bind(earner_email)
                .fetch_all(self.db.pool())
                .await
                .map_err(db_err)?;

        let mut summary = CommissionSummary::default();
        for (kind, amount) in &rows {
            let amount = parse_decimal(amount)?;
            summary.total_earned += amount;
            summary.total_count += 1;
            match parse_enum::<CommissionKind>(kind)? {
                CommissionKind::PlanPurchase => summary.purchase_earned += amount,
                CommissionKind::UnilevelDaily => summary.daily_earned += amount,
            }
        }
        Ok(summary)
    }

    async fn earnings_by_member(&self, earner_email: &str) -> Result<HashMap<String, Decimal>, StoreError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT referred_email, amount FROM commission_earnings WHERE earner_email = ?",
        )
        .bind(earner_email)
        .fetch_all(self.db.pool())
        .await
        .map_err(db_err)?;

        let mut totals: HashMap<String, Decimal> = HashMap::new();
        for (member, amount) in rows {
            *totals.entry(member).or_default() += parse_decimal(&amount)?;
        }
        Ok(totals)
    }

    async fn day_report(&self, date: NaiveDate) -> Result<UnilevelReport, StoreError> {
        let rows: Vec<(String, i64, String)> = sqlx::query_as(
            r#"
            SELECT earner_email, level, amount FROM commission_earnings
            WHERE kind = ? AND earning_date = ?
            ORDER BY level
            "#,
        )
        .bind(CommissionKind::UnilevelDaily.to_string())
        .bind(day_key(date))
        .fetch_all(self.db.pool())
        .await
        .map_err(db_err)?;

        let mut report = UnilevelReport::empty(date);
        let mut earners: Vec<&str> = Vec::new();
        for (earner, level, amount) in &rows {
            let amount = parse_decimal(amount)?;
            report.credited += 1;
            report.total_amount += amount;
            report.add_to_level(level_from(*level), amount);
            if !earners.contains(&earner.as_str()) {
                earners.push(earner.as_str());
            }
        }
        report.earners_processed = earners.len();
        Ok(report)
    }
}
