use crate::db::{Database, db_err, from_millis, parse_decimal, parse_enum, to_millis};
use crate::ledger::post_in_tx;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use tic_core::common::Page;
use tic_core::distribution::entity::{
    CreditOutcome, DistributionDaySummary, DistributionRecord, DistributionTotals, Subscription,
};
use tic_core::distribution::port::DistributionStore;
use tic_core::store::error::StoreError;
use tic_core::wallet::entity::{BalanceChange, Posting, TransactionKind, WalletAccount};
use tic_core::wallet::error::WalletError;
use tracing::info;

pub struct SqliteDistributionStore {
    db: Database,
}

impl SqliteDistributionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn subscription_from_row(row: &SqliteRow) -> Result<Subscription, StoreError> {
    let status: String = row.try_get("status").map_err(db_err)?;
    let start_date: i64 = row.try_get("start_date").map_err(db_err)?;
    let end_date: i64 = row.try_get("end_date").map_err(db_err)?;
    let created_at: i64 = row.try_get("created_at").map_err(db_err)?;
    Ok(Subscription {
        id: row.try_get("id").map_err(db_err)?,
        user_email: row.try_get("user_email").map_err(db_err)?,
        plan_id: row.try_get("plan_id").map_err(db_err)?,
        plan_name: row.try_get("plan_name").map_err(db_err)?,
        status: parse_enum(&status)?,
        start_date: from_millis(start_date)?,
        end_date: from_millis(end_date)?,
        created_at: from_millis(created_at)?,
    })
}

fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) async fn insert_subscription(
    conn: &mut SqliteConnection,
    subscription: &Subscription,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO subscriptions (id, user_email, plan_id, plan_name, status, start_date, end_date, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&subscription.id)
    .bind(&subscription.user_email)
    .bind(&subscription.plan_id)
    .bind(&subscription.plan_name)
    .bind(subscription.status.to_string())
    .bind(to_millis(subscription.start_date))
    .bind(to_millis(subscription.end_date))
    .bind(to_millis(subscription.created_at))
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;
    Ok(())
}

fn record_from_row(row: &SqliteRow) -> Result<DistributionRecord, StoreError> {
    let date: String = row.try_get("distribution_date").map_err(db_err)?;
    let amount: String = row.try_get("token_amount").map_err(db_err)?;
    let created_at: i64 = row.try_get("created_at").map_err(db_err)?;
    Ok(DistributionRecord {
        subscription_id: row.try_get("subscription_id").map_err(db_err)?,
        plan_id: row.try_get("plan_id").map_err(db_err)?,
        plan_name: row.try_get("plan_name").map_err(db_err)?,
        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|e| StoreError::Database(format!("Invalid date '{}': {}", date, e)))?,
        token_amount: parse_decimal(&amount)?,
        created_at: from_millis(created_at)?,
    })
}

/// Joins each credit with its subscription, scoped to one owner and
/// optionally one plan.
fn user_distributions_query<'a>(
    select: &str,
    email: &'a str,
    plan_id: Option<&'a str>,
) -> QueryBuilder<'a, Sqlite> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(select);
    qb.push(
        " FROM token_distributions d JOIN subscriptions s ON s.id = d.subscription_id WHERE d.user_email = ",
    )
    .push_bind(email);
    if let Some(plan_id) = plan_id {
        qb.push(" AND s.plan_id = ").push_bind(plan_id);
    }
    qb
}

#[async_trait]
impl DistributionStore for SqliteDistributionStore {
    async fn create_subscription(&self, subscription: &Subscription) -> Result<(), StoreError> {
        let mut conn = self.db.pool().acquire().await.map_err(db_err)?;
        insert_subscription(&mut *conn, subscription).await?;
        info!(
            "Subscription {} ({}) created for {}",
            subscription.id, subscription.plan_id, subscription.user_email
        );
        Ok(())
    }

    async fn active_subscriptions(&self, now: DateTime<Utc>) -> Result<Vec<Subscription>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM subscriptions WHERE status = 'active' AND end_date >= ? ORDER BY created_at",
        )
        .bind(to_millis(now))
        .fetch_all(self.db.pool())
        .await
        .map_err(db_err)?;
        rows.iter().map(subscription_from_row).collect()
    }

    async fn credit_daily(
        &self,
        subscription: &Subscription,
        date: NaiveDate,
        tokens: Decimal,
        now: DateTime<Utc>,
    ) -> Result<CreditOutcome, StoreError> {
        let mut tx = self.db.pool().begin().await.map_err(db_err)?;

        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO token_distributions (subscription_id, user_email, distribution_date, token_amount, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&subscription.id)
        .bind(&subscription.user_email)
        .bind(day_key(date))
        .bind(tokens.to_string())
        .bind(to_millis(now))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        if inserted.rows_affected() == 0 {
            return Ok(CreditOutcome::AlreadyDistributed);
        }

        let posting = Posting::new(
            subscription.user_email.clone(),
            format!("dist_{}_{}", subscription.id, day_key(date)),
            TransactionKind::Distribution,
            format!("Daily TIC distribution ({})", subscription.plan_name),
        )
        .with_change(BalanceChange::credit(WalletAccount::Tic, tokens))
        .with_reference(subscription.id.clone())
        .with_metadata(serde_json::json!({
            "plan_id": subscription.plan_id,
            "distribution_date": day_key(date),
        }));
        post_in_tx(&mut *tx, &[posting], now)
            .await
            .map_err(|e: WalletError| StoreError::Database(e.to_string()))?;

        tx.commit().await.map_err(db_err)?;
        Ok(CreditOutcome::Credited)
    }

    async fn day_summary(&self, date: NaiveDate) -> Result<DistributionDaySummary, StoreError> {
        let amounts: Vec<String> =
            sqlx::query_scalar("SELECT token_amount FROM token_distributions WHERE distribution_date = ?")
                .bind(day_key(date))
                .fetch_all(self.db.pool())
                .await
                .map_err(db_err)?;

        let mut total_tokens = Decimal::ZERO;
        for raw in &amounts {
            total_tokens += parse_decimal(raw)?;
        }
        Ok(DistributionDaySummary {
            date,
            distributions: u64::try_from(amounts.len()).unwrap_or_default(),
            total_tokens,
        })
    }

    async fn list_user_subscriptions(&self, email: &str) -> Result<Vec<Subscription>, StoreError> {
        let rows = sqlx::query("SELECT * FROM subscriptions WHERE user_email = ? ORDER BY created_at DESC")
            .bind(email)
            .fetch_all(self.db.pool())
            .await
            .map_err(db_err)?;
        rows.iter().map(subscription_from_row).collect()
    }

    async fn list_user_distributions(
        &self,
        email: &str,
        plan_id: Option<&str>,
        page: Page,
    ) -> Result<(Vec<DistributionRecord>, bool), StoreError> {
        let mut qb = user_distributions_query(
            "SELECT d.subscription_id, s.plan_id, s.plan_name, d.distribution_date, d.token_amount, d.created_at",
            email,
            plan_id,
        );
        qb.push(" ORDER BY d.distribution_date DESC, d.id DESC LIMIT ")
            .push_bind(i64::from(page.limit) + 1)
            .push(" OFFSET ")
            .push_bind(i64::from(page.offset));

        let rows = qb.build().fetch_all(self.db.pool()).await.map_err(db_err)?;
        let mut records = rows.iter().map(record_from_row).collect::<Result<Vec<_>, _>>()?;
        let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
        let has_more = records.len() > limit;
        records.truncate(limit);
        Ok((records, has_more))
    }

    async fn user_distribution_totals(
        &self,
        email: &str,
        plan_id: Option<&str>,
    ) -> Result<DistributionTotals, StoreError> {
        let mut qb = user_distributions_query("SELECT d.token_amount", email, plan_id);
        let amounts: Vec<String> = qb
            .build_query_scalar()
            .fetch_all(self.db.pool())
            .await
            .map_err(db_err)?;

        let mut totals = DistributionTotals::default();
        for raw in &amounts {
            totals.total_tokens += parse_decimal(raw)?;
            totals.count += 1;
        }
        Ok(totals)
    }
}
