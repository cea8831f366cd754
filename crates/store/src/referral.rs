use crate::db::{Database, db_err, from_millis, parse_decimal, to_millis};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tic_core::referral::entity::{Referral, ReferralCode, ReferralStats};
use tic_core::referral::port::ReferralStore;
use tic_core::store::error::StoreError;
use tracing::info;

pub struct SqliteReferralStore {
    db: Database,
}

impl SqliteReferralStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn code_from_row(row: &SqliteRow) -> Result<ReferralCode, StoreError> {
    let total_referrals: i64 = row.try_get("total_referrals").map_err(db_err)?;
    let total_earnings: String = row.try_get("total_earnings").map_err(db_err)?;
    let created_at: i64 = row.try_get("created_at").map_err(db_err)?;
    Ok(ReferralCode {
        code: row.try_get("code").map_err(db_err)?,
        user_email: row.try_get("user_email").map_err(db_err)?,
        link: row.try_get("link").map_err(db_err)?,
        total_referrals: u64::try_from(total_referrals).unwrap_or_default(),
        total_earnings: parse_decimal(&total_earnings)?,
        created_at: from_millis(created_at)?,
    })
}

fn referral_from_row(row: &SqliteRow) -> Result<Referral, StoreError> {
    let created_at: i64 = row.try_get("created_at").map_err(db_err)?;
    Ok(Referral {
        referrer_email: row.try_get("referrer_email").map_err(db_err)?,
        referred_email: row.try_get("referred_email").map_err(db_err)?,
        referral_code: row.try_get("referral_code").map_err(db_err)?,
        created_at: from_millis(created_at)?,
    })
}

pub(crate) async fn insert_code_row(
    conn: &mut SqliteConnection,
    code: &ReferralCode,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO referral_codes (code, user_email, link, total_referrals, total_earnings, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&code.code)
    .bind(&code.user_email)
    .bind(&code.link)
    .bind(i64::try_from(code.total_referrals).unwrap_or(i64::MAX))
    .bind(code.total_earnings.to_string())
    .bind(to_millis(code.created_at))
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;
    Ok(())
}

/// Stores the relationship and bumps the referrer's count; the caller owns
/// the transaction.
pub(crate) async fn insert_referral_row(
    conn: &mut SqliteConnection,
    referral: &Referral,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO referrals (referred_email, referrer_email, referral_code, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&referral.referred_email)
    .bind(&referral.referrer_email)
    .bind(&referral.referral_code)
    .bind(to_millis(referral.created_at))
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;

    let updated = sqlx::query(
        "UPDATE referral_codes SET total_referrals = total_referrals + 1 WHERE code = ?",
    )
    .bind(&referral.referral_code)
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;
    if updated.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

#[async_trait]
impl ReferralStore for SqliteReferralStore {
    async fn get_code_for_user(&self, email: &str) -> Result<Option<ReferralCode>, StoreError> {
        let row = sqlx::query("SELECT * FROM referral_codes WHERE user_email = ?")
            .bind(email)
            .fetch_optional(self.db.pool())
            .await
            .map_err(db_err)?;
        row.as_ref().map(code_from_row).transpose()
    }

    async fn find_code(&self, code: &str) -> Result<Option<ReferralCode>, StoreError> {
        let row = sqlx::query("SELECT * FROM referral_codes WHERE code = ?")
            .bind(code.trim().to_uppercase())
            .fetch_optional(self.db.pool())
            .await
            .map_err(db_err)?;
        row.as_ref().map(code_from_row).transpose()
    }

    async fn insert_code(&self, code: &ReferralCode) -> Result<(), StoreError> {
        let mut conn = self.db.pool().acquire().await.map_err(db_err)?;
        insert_code_row(&mut *conn, code).await?;
        info!("Issued referral code {} to {}", code.code, code.user_email);
        Ok(())
    }

    async fn record_referral(&self, referral: &Referral) -> Result<(), StoreError> {
        let mut tx = self.db.pool().begin().await.map_err(db_err)?;
        insert_referral_row(&mut *tx, referral).await?;
        tx.commit().await.map_err(db_err)?;
        info!(
            "Recorded referral {} -> {} ({})",
            referral.referrer_email, referral.referred_email, referral.referral_code
        );
        Ok(())
    }

    async fn get_referrer(&self, referred_email: &str) -> Result<Option<Referral>, StoreError> {
        let row = sqlx::query("SELECT * FROM referrals WHERE referred_email = ?")
            .bind(referred_email)
            .fetch_optional(self.db.pool())
            .await
            .map_err(db_err)?;
        row.as_ref().map(referral_from_row).transpose()
    }

    async fn list_referrals(&self, referrer_email: &str) -> Result<Vec<Referral>, StoreError> {
        let rows = sqlx::query("SELECT * FROM referrals WHERE referrer_email = ? ORDER BY created_at DESC")
            .bind(referrer_email)
            .fetch_all(self.db.pool())
            .await
            .map_err(db_err)?;
        rows.iter().map(referral_from_row).collect()
    }

    /// Active referrals are referred users whose email is verified.
    async fn stats(&self, referrer_email: &str) -> Result<ReferralStats, StoreError> {
        let (total, active): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(CASE WHEN u.email_verified = 1 THEN 1 ELSE 0 END), 0)
            FROM referrals r
            LEFT JOIN users u ON u.email = r.referred_email
            WHERE r.referrer_email = ?
            "#,
        )
        .bind(referrer_email)
        .fetch_one(self.db.pool())
        .await
        .map_err(db_err)?;

        let earnings: Option<String> =
            sqlx::query_scalar("SELECT total_earnings FROM referral_codes WHERE user_email = ?")
                .bind(referrer_email)
                .fetch_optional(self.db.pool())
                .await
                .map_err(db_err)?;

        Ok(ReferralStats {
            total_referrals: u64::try_from(total).unwrap_or_default(),
            active_referrals: u64::try_from(active).unwrap_or_default(),
            total_earnings: earnings
                .as_deref()
                .map(parse_decimal)
                .transpose()?
                .unwrap_or(Decimal::ZERO),
        })
    }
}
