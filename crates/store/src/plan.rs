use crate::commission::{credit_in, upline_in};
use crate::db::{Database, db_err, from_millis, parse_decimal, to_millis};
use crate::distribution::insert_subscription;
use crate::ledger::post_in_tx;
use crate::notification::insert_notification;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tic_core::commission::rules::{COMMISSION_PLAN_ID, PURCHASE_COMMISSION_DEPTH, purchase_commissions};
use tic_core::common::Page;
use tic_core::common::id::new_id;
use tic_core::distribution::entity::{CreditOutcome, Subscription, SubscriptionStatus};
use tic_core::notify::entity::{Notification, NotificationPriority};
use tic_core::plan::entity::{PaymentPlan, PaymentRecord, PaymentStats, Purchase};
use tic_core::plan::error::PlanError;
use tic_core::plan::port::PlanStore;
use tic_core::wallet::entity::{BalanceChange, Posting, TransactionKind, WalletAccount};
use tracing::info;

/// # Summary
/// SQLite implementation of [`PlanStore`].
///
/// # Invariants
/// - The catalogue is seeded by the schema (`starter`, `vip`).
pub struct SqlitePlanStore {
    db: Database,
}

impl SqlitePlanStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn storage(e: impl std::fmt::Display) -> PlanError {
    PlanError::Storage(e.to_string())
}

fn plan_from_row(row: &SqliteRow) -> Result<PaymentPlan, PlanError> {
    let price: String = row.try_get("price").map_err(storage)?;
    let duration_days: i64 = row.try_get("duration_days").map_err(storage)?;
    Ok(PaymentPlan {
        id: row.try_get("id").map_err(storage)?,
        name: row.try_get("name").map_err(storage)?,
        description: row.try_get("description").map_err(storage)?,
        price: parse_decimal(&price)?,
        currency: row.try_get("currency").map_err(storage)?,
        duration_days: u32::try_from(duration_days).map_err(storage)?,
        is_active: row.try_get("is_active").map_err(storage)?,
        sort_order: row.try_get("sort_order").map_err(storage)?,
    })
}

fn payment_from_row(row: &SqliteRow) -> Result<PaymentRecord, PlanError> {
    let dec = |col: &str| -> Result<Decimal, PlanError> {
        let raw: String = row.try_get(col).map_err(storage)?;
        Ok(parse_decimal(&raw)?)
    };
    let created_at: i64 = row.try_get("created_at").map_err(storage)?;
    Ok(PaymentRecord {
        id: row.try_get("id").map_err(storage)?,
        user_email: row.try_get("user_email").map_err(storage)?,
        plan_id: row.try_get("plan_id").map_err(storage)?,
        plan_name: row.try_get("plan_name").map_err(storage)?,
        amount: dec("amount")?,
        currency: row.try_get("currency").map_err(storage)?,
        balance_before: dec("balance_before")?,
        balance_after: dec("balance_after")?,
        subscription_id: row.try_get("subscription_id").map_err(storage)?,
        created_at: from_millis(created_at)?,
    })
}

async fn fetch_plan(conn: &mut SqliteConnection, id: &str) -> Result<Option<PaymentPlan>, PlanError> {
    let row = sqlx::query("SELECT * FROM payment_plans WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(storage)?;
    row.as_ref().map(plan_from_row).transpose()
}

async fn insert_payment(conn: &mut SqliteConnection, payment: &PaymentRecord) -> Result<(), PlanError> {
    sqlx::query(
        r#"
        INSERT INTO payment_transactions (
            id, user_email, plan_id, plan_name, amount, currency, balance_before,
            balance_after, subscription_id, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.user_email)
    .bind(&payment.plan_id)
    .bind(&payment.plan_name)
    .bind(payment.amount.to_string())
    .bind(&payment.currency)
    .bind(payment.balance_before.to_string())
    .bind(payment.balance_after.to_string())
    .bind(&payment.subscription_id)
    .bind(to_millis(payment.created_at))
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;
    Ok(())
}

#[async_trait]
impl PlanStore for SqlitePlanStore {
    async fn list_plans(&self, active_only: bool) -> Result<Vec<PaymentPlan>, PlanError> {
        let sql = if active_only {
            "SELECT * FROM payment_plans WHERE is_active = 1 ORDER BY sort_order, id"
        } else {
            "SELECT * FROM payment_plans ORDER BY sort_order, id"
        };
        let rows = sqlx::query(sql)
            .fetch_all(self.db.pool())
            .await
            .map_err(storage)?;
        rows.iter().map(plan_from_row).collect()
    }

    async fn get_plan(&self, id: &str) -> Result<Option<PaymentPlan>, PlanError> {
        let mut conn = self.db.pool().acquire().await.map_err(storage)?;
        fetch_plan(&mut *conn, id).await
    }

    async fn purchase(
        &self,
        email: &str,
        plan_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Purchase, PlanError> {
        let mut tx = self.db.pool().begin().await.map_err(storage)?;

        let plan = fetch_plan(&mut *tx, plan_id).await?.ok_or(PlanError::NotFound)?;
        if !plan.is_active {
            return Err(PlanError::Inactive(plan.id));
        }

        let subscription = Subscription {
            id: new_id(),
            user_email: email.to_string(),
            plan_id: plan.id.clone(),
            plan_name: plan.name.clone(),
            status: SubscriptionStatus::Active,
            start_date: now,
            end_date: now + Duration::days(i64::from(plan.duration_days)),
            created_at: now,
        };
        let mut payment = PaymentRecord {
            id: new_id(),
            user_email: email.to_string(),
            plan_id: plan.id.clone(),
            plan_name: plan.name.clone(),
            amount: plan.price,
            currency: plan.currency.clone(),
            balance_before: Decimal::ZERO,
            balance_after: Decimal::ZERO,
            subscription_id: subscription.id.clone(),
            created_at: now,
        };

        // 1. Debit; an insufficient balance drops the transaction
        let posting = Posting::new(
            email,
            payment.transaction_id(),
            TransactionKind::PlanPurchase,
            format!("Plan purchase: {}", plan.name),
        )
        .with_change(BalanceChange::debit(WalletAccount::Total, plan.price))
        .with_reference(payment.id.clone())
        .with_metadata(serde_json::json!({
            "plan_id": plan.id,
            "subscription_id": subscription.id,
        }));
        let outcome = post_in_tx(&mut *tx, &[posting], now).await?;
        let debit = outcome
            .transactions
            .first()
            .ok_or_else(|| storage("Plan debit was not recorded"))?;
        payment.balance_before = debit.balance_before;
        payment.balance_after = debit.balance_after;
        let wallet = outcome
            .wallets
            .into_iter()
            .next()
            .ok_or_else(|| storage("Posting returned no wallet"))?;

        // 2. Payment and subscription
        insert_payment(&mut *tx, &payment).await?;
        insert_subscription(&mut *tx, &subscription).await?;

        // 3. Upline commissions
        let mut commissions = Vec::new();
        if plan.id == COMMISSION_PLAN_ID {
            let upline = upline_in(&mut *tx, email, PURCHASE_COMMISSION_DEPTH).await?;
            for earning in purchase_commissions(email, &upline, &payment.id, now.date_naive(), now, new_id) {
                if credit_in(&mut *tx, &earning, now).await? == CreditOutcome::Credited {
                    commissions.push(earning);
                }
            }
        }

        let notification = Notification::new(
            new_id(),
            email,
            "Plan Activated",
            format!(
                "Your {} is active until {}. ${} was deducted from your main balance.",
                plan.name,
                subscription.end_date.format("%Y-%m-%d"),
                plan.price
            ),
            "payment",
            NotificationPriority::Medium,
            now,
        );
        insert_notification(&mut *tx, &notification).await?;

        tx.commit().await.map_err(storage)?;

        info!(
            "{} bought {} for {} USD ({} commission(s) paid)",
            email,
            plan.id,
            plan.price,
            commissions.len()
        );
        Ok(Purchase {
            payment,
            subscription,
            wallet,
            commissions,
        })
    }

    async fn list_payments(
        &self,
        email: &str,
        page: Page,
    ) -> Result<(Vec<PaymentRecord>, bool), PlanError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM payment_transactions WHERE user_email = ?
            ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?
            "#,
        )
        .bind(email)
        .bind(i64::from(page.limit) + 1)
        .bind(i64::from(page.offset))
        .fetch_all(self.db.pool())
        .await
        .map_err(storage)?;

        let mut payments = rows.iter().map(payment_from_row).collect::<Result<Vec<_>, _>>()?;
        let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
        let has_more = payments.len() > limit;
        payments.truncate(limit);
        Ok((payments, has_more))
    }

    async fn payment_stats(&self, email: &str) -> Result<PaymentStats, PlanError> {
        let amounts: Vec<String> =
            sqlx::query_scalar("SELECT amount FROM payment_transactions WHERE user_email = ?")
                .bind(email)
                .fetch_all(self.db.pool())
                .await
                .map_err(storage)?;

        let mut stats = PaymentStats::default();
        for raw in &amounts {
            stats.total_spent += parse_decimal(raw)?;
            stats.total_payments += 1;
        }
        Ok(stats)
    }
}
