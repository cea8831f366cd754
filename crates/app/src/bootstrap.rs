//! Start-up provisioning of the back-office accounts.

use chrono::{DateTime, Utc};
use tic_core::config::AdminConfig;
use tic_core::common::validate::normalize_email;
use tic_core::store::error::StoreError;
use tic_core::user::entity::{User, UserRole, UserUpdate};
use tic_core::user::port::UserStore;
use tic_core::wallet::port::WalletStore;

/// # Summary
/// Creates or refreshes every allow-listed admin account.
///
/// # Logic
/// 1. Does nothing unless `admin.bootstrap_password` is set.
/// 2. Missing accounts are created with the `admin` role and a wallet.
/// 3. Existing accounts are promoted to `admin` and get the bootstrap
///    password.
///
/// # Returns
/// * Number of accounts created or updated.
pub async fn bootstrap_admins(
    users: &dyn UserStore,
    wallets: &dyn WalletStore,
    cfg: &AdminConfig,
    now: DateTime<Utc>,
) -> Result<usize, Box<dyn std::error::Error>> {
    let Some(password) = cfg.bootstrap_password.as_deref() else {
        return Ok(0);
    };

    let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
    let mut touched = 0;
    for raw in &cfg.emails {
        let email = normalize_email(raw);
        match users.get_user(&email).await? {
            Some(_) => {
                users.update_user(&email, &UserUpdate::Role(UserRole::Admin), now).await?;
                users
                    .update_user(&email, &UserUpdate::PasswordHash(password_hash.clone()), now)
                    .await?;
                tracing::info!("Admin account {} refreshed", email);
            }
            None => {
                let mut user = User::new(email.clone(), password_hash.clone(), None, UserRole::Admin, now);
                user.email_verified = true;
                match users.create_user(&user).await {
                    Ok(()) | Err(StoreError::Duplicate(_)) => {}
                    Err(e) => return Err(e.into()),
                }
                wallets.get_or_create_wallet(&email).await?;
                tracing::info!("Admin account {} created", email);
            }
        }
        touched += 1;
    }
    Ok(touched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tic_store::{Database, SqliteUserStore, SqliteWalletStore};

    #[tokio::test]
    async fn test_bootstrap_creates_and_promotes() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(dir.path()).await.unwrap();
        let users = SqliteUserStore::new(db.clone());
        let wallets = SqliteWalletStore::new(db);
        let now = Utc::now();

        let existing = User::new("ops@ticgloballtd.com".into(), "x".into(), None, UserRole::User, now);
        users.create_user(&existing).await.unwrap();

        let cfg = AdminConfig {
            emails: vec!["Admin@TicGlobalLtd.com".into(), "ops@ticgloballtd.com".into()],
            token_ttl_secs: 3600,
            bootstrap_password: Some("Adm1n!pass".into()),
        };
        let touched = bootstrap_admins(&users, &wallets, &cfg, now).await.unwrap();
        assert_eq!(touched, 2);

        let created = users.get_user("admin@ticgloballtd.com").await.unwrap().unwrap();
        assert_eq!(created.role, UserRole::Admin);
        assert!(bcrypt::verify("Adm1n!pass", &created.password_hash).unwrap());
        assert!(wallets.get_wallet("admin@ticgloballtd.com").await.unwrap().is_some());

        let promoted = users.get_user("ops@ticgloballtd.com").await.unwrap().unwrap();
        assert_eq!(promoted.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn test_bootstrap_without_password_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(dir.path()).await.unwrap();
        let users = SqliteUserStore::new(db.clone());
        let wallets = SqliteWalletStore::new(db);

        let touched = bootstrap_admins(&users, &wallets, &AdminConfig::default(), Utc::now())
            .await
            .unwrap();
        assert_eq!(touched, 0);
        assert!(users.get_user("admin@ticgloballtd.com").await.unwrap().is_none());
    }
}
