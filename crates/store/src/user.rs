use crate::db::{Database, db_err, from_millis, parse_enum, to_millis};
use crate::ledger::load_or_create_wallet;
use crate::referral::{insert_code_row, insert_referral_row};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tic_core::common::Page;
use tic_core::store::error::StoreError;
use tic_core::user::entity::{
    PasswordResetToken, User, UserUpdate, VerificationChannel, VerificationCode,
};
use tic_core::user::registration::NewAccount;
use tic_core::user::port::{UserStore, VerificationStore};
use tracing::info;

/// # Summary
/// SQLite implementation of [`UserStore`] and [`VerificationStore`].
pub struct SqliteUserStore {
    db: Database,
}

impl SqliteUserStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn user_from_row(row: &SqliteRow) -> Result<User, StoreError> {
    let dob: Option<String> = row.try_get("date_of_birth").map_err(db_err)?;
    let date_of_birth = dob
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|e| StoreError::Database(format!("Invalid date_of_birth '{}': {}", raw, e)))
        })
        .transpose()?;
    let identity: String = row.try_get("identity_status").map_err(db_err)?;
    let role: String = row.try_get("role").map_err(db_err)?;
    let created_at: i64 = row.try_get("created_at").map_err(db_err)?;
    let updated_at: i64 = row.try_get("updated_at").map_err(db_err)?;

    Ok(User {
        email: row.try_get("email").map_err(db_err)?,
        password_hash: row.try_get("password_hash").map_err(db_err)?,
        first_name: row.try_get("first_name").map_err(db_err)?,
        last_name: row.try_get("last_name").map_err(db_err)?,
        date_of_birth,
        country: row.try_get("country").map_err(db_err)?,
        country_of_birth: row.try_get("country_of_birth").map_err(db_err)?,
        gender: row.try_get("gender").map_err(db_err)?,
        address: row.try_get("address").map_err(db_err)?,
        phone: row.try_get("phone").map_err(db_err)?,
        email_verified: row.try_get("email_verified").map_err(db_err)?,
        phone_verified: row.try_get("phone_verified").map_err(db_err)?,
        identity_status: parse_enum(&identity)?,
        profile_completed: row.try_get("profile_completed").map_err(db_err)?,
        role: parse_enum(&role)?,
        created_at: from_millis(created_at)?,
        updated_at: from_millis(updated_at)?,
    })
}

const USER_COLUMNS: &str = "email, password_hash, first_name, last_name, date_of_birth, country, \
     country_of_birth, gender, address, phone, email_verified, phone_verified, identity_status, \
     profile_completed, role, created_at, updated_at";

async fn insert_user(conn: &mut SqliteConnection, user: &User) -> Result<(), StoreError> {
    let sql = format!(
        "INSERT INTO users ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        USER_COLUMNS
    );
    sqlx::query(&sql)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()))
        .bind(&user.country)
        .bind(&user.country_of_birth)
        .bind(&user.gender)
        .bind(&user.address)
        .bind(&user.phone)
        .bind(user.email_verified)
        .bind(user.phone_verified)
        .bind(user.identity_status.to_string())
        .bind(user.profile_completed)
        .bind(user.role.to_string())
        .bind(to_millis(user.created_at))
        .bind(to_millis(user.updated_at))
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
    Ok(())
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn get_user(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.db.pool())
            .await
            .map_err(db_err)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let mut conn = self.db.pool().acquire().await.map_err(db_err)?;
        insert_user(&mut *conn, user).await?;
        info!("Created user {} ({})", user.email, user.role);
        Ok(())
    }

    async fn create_account(&self, account: &NewAccount) -> Result<(), StoreError> {
        let user = &account.user;
        let mut tx = self.db.pool().begin().await.map_err(db_err)?;
        insert_user(&mut *tx, user).await?;
        load_or_create_wallet(&mut *tx, &user.email, user.created_at).await?;
        insert_code_row(&mut *tx, &account.referral_code).await?;
        if let Some(referral) = &account.referral {
            insert_referral_row(&mut *tx, referral).await?;
        }
        tx.commit().await.map_err(db_err)?;

        info!(
            "Created account {} with referral code {} (referred by {:?})",
            user.email,
            account.referral_code.code,
            account.referral.as_ref().map(|r| r.referrer_email.as_str())
        );
        Ok(())
    }

    async fn update_user(
        &self,
        email: &str,
        update: &UserUpdate,
        now: DateTime<Utc>,
    ) -> Result<User, StoreError> {
        let query = match update {
            UserUpdate::EmailVerified => {
                sqlx::query("UPDATE users SET email_verified = 1, updated_at = ? WHERE email = ?")
            }
            UserUpdate::PhoneVerified { phone } => sqlx::query(
                "UPDATE users SET phone = ?, phone_verified = 1, updated_at = ? WHERE email = ?",
            )
            .bind(phone),
            UserUpdate::Profile(profile) => sqlx::query(
                r#"
                UPDATE users SET first_name = ?, last_name = ?, date_of_birth = ?,
                    country_of_birth = ?, gender = ?, address = ?, profile_completed = 1,
                    updated_at = ?
                WHERE email = ?
                "#,
            )
            .bind(&profile.first_name)
            .bind(&profile.last_name)
            .bind(profile.date_of_birth.format("%Y-%m-%d").to_string())
            .bind(&profile.country_of_birth)
            .bind(&profile.gender)
            .bind(&profile.address),
            UserUpdate::IdentitySubmitted { country } => sqlx::query(
                r#"
                UPDATE users SET identity_status = 'pending', country = COALESCE(country, ?),
                    updated_at = ?
                WHERE email = ?
                "#,
            )
            .bind(country),
            UserUpdate::IdentityReviewed(status) => {
                sqlx::query("UPDATE users SET identity_status = ?, updated_at = ? WHERE email = ?")
                    .bind(status.to_string())
            }
            UserUpdate::PasswordHash(hash) => {
                sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE email = ?")
                    .bind(hash)
            }
            UserUpdate::Role(role) => {
                sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE email = ?")
                    .bind(role.to_string())
            }
        };

        let mut tx = self.db.pool().begin().await.map_err(db_err)?;
        let updated = query
            .bind(to_millis(now))
            .bind(email)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        let row = sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;
        let user = user_from_row(&row)?;
        tx.commit().await.map_err(db_err)?;
        Ok(user)
    }

    async fn list_users(&self, page: Page) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY created_at DESC LIMIT ? OFFSET ?")
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(self.db.pool())
            .await
            .map_err(db_err)?;
        rows.iter().map(user_from_row).collect()
    }
}

fn code_from_row(row: &SqliteRow) -> Result<VerificationCode, StoreError> {
    let channel: String = row.try_get("channel").map_err(db_err)?;
    let expires_at: i64 = row.try_get("expires_at").map_err(db_err)?;
    let created_at: i64 = row.try_get("created_at").map_err(db_err)?;
    Ok(VerificationCode {
        channel: parse_enum(&channel)?,
        target: row.try_get("target").map_err(db_err)?,
        user_email: row.try_get("user_email").map_err(db_err)?,
        code: row.try_get("code").map_err(db_err)?,
        expires_at: from_millis(expires_at)?,
        created_at: from_millis(created_at)?,
    })
}

#[async_trait]
impl VerificationStore for SqliteUserStore {
    async fn upsert_code(&self, code: &VerificationCode) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO verification_codes (channel, target, user_email, code, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (channel, target) DO UPDATE SET
                user_email = excluded.user_email,
                code = excluded.code,
                expires_at = excluded.expires_at,
                created_at = excluded.created_at
            "#,
        )
        .bind(code.channel.to_string())
        .bind(&code.target)
        .bind(&code.user_email)
        .bind(&code.code)
        .bind(to_millis(code.expires_at))
        .bind(to_millis(code.created_at))
        .execute(self.db.pool())
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_code(
        &self,
        channel: VerificationChannel,
        target: &str,
    ) -> Result<Option<VerificationCode>, StoreError> {
        let row = sqlx::query("SELECT * FROM verification_codes WHERE channel = ? AND target = ?")
            .bind(channel.to_string())
            .bind(target)
            .fetch_optional(self.db.pool())
            .await
            .map_err(db_err)?;
        row.as_ref().map(code_from_row).transpose()
    }

    async fn delete_code(&self, channel: VerificationChannel, target: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM verification_codes WHERE channel = ? AND target = ?")
            .bind(channel.to_string())
            .bind(target)
            .execute(self.db.pool())
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn save_reset_token(&self, token: &PasswordResetToken) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO password_reset_tokens (token, email, expires_at, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&token.token)
        .bind(&token.email)
        .bind(to_millis(token.expires_at))
        .bind(to_millis(token.created_at))
        .execute(self.db.pool())
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_reset_token(&self, token: &str) -> Result<Option<PasswordResetToken>, StoreError> {
        let row = sqlx::query("SELECT * FROM password_reset_tokens WHERE token = ?")
            .bind(token)
            .fetch_optional(self.db.pool())
            .await
            .map_err(db_err)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let expires_at: i64 = row.try_get("expires_at").map_err(db_err)?;
        let created_at: i64 = row.try_get("created_at").map_err(db_err)?;
        Ok(Some(PasswordResetToken {
            token: row.try_get("token").map_err(db_err)?,
            email: row.try_get("email").map_err(db_err)?,
            expires_at: from_millis(expires_at)?,
            created_at: from_millis(created_at)?,
        }))
    }

    async fn delete_reset_token(&self, token: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM password_reset_tokens WHERE token = ?")
            .bind(token)
            .execute(self.db.pool())
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
