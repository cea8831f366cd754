mod bootstrap;
mod logging;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tic_api::server::{AppState, start_server};
use tic_cache::MemCache;
use tic_core::cache::port::Cache;
use tic_core::common::time::{RealTimeProvider, TimeProvider};
use tic_notify::FanoutNotifier;
use tic_store::{
    Database, SqliteCommissionStore, SqliteDistributionStore, SqliteFundingStore,
    SqliteNotificationStore, SqlitePlanStore, SqliteReferralStore, SqliteUserStore,
    SqliteWalletStore,
};
use tracing::info;

const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// # Summary
/// Process entry point and DI container.
///
/// # Logic
/// 1. Load configuration (`TIC_CONFIG` or `config/tic.toml`, then `TIC__*`).
/// 2. Install logging and the process-wide TLS crypto provider.
/// 3. Open the database and build every store behind its port.
/// 4. Provision the admin accounts when a bootstrap password is set.
/// 5. Serve HTTP until Ctrl-C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Configuration
    let config_path =
        std::env::var("TIC_CONFIG").unwrap_or_else(|_| settings::DEFAULT_CONFIG_PATH.to_string());
    let config = Arc::new(settings::load_config(&config_path)?);

    // 2. Logging
    let _log_guard = logging::init_logging(&config.logging);
    info!("TIC GLOBAL server starting (config: {})", config_path);
    if config.server.jwt_secret == "CHANGE_ME_JWT_SECRET" {
        tracing::warn!("Using the default JWT secret; set server.jwt_secret before going live");
    }
    // reqwest (Telegram) is built without a bundled provider.
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        tracing::debug!("TLS crypto provider already installed");
    }

    // 3. Infrastructure
    tic_store::config::set_root_dir(PathBuf::from(&config.database.data_dir));
    let db = Database::open().await?;

    let users = Arc::new(SqliteUserStore::new(db.clone()));
    let wallets = Arc::new(SqliteWalletStore::new(db.clone()));
    let clock: Arc<dyn TimeProvider> = Arc::new(RealTimeProvider);
    let cache: Arc<dyn Cache> = Arc::new(MemCache::new());
    let notifier = Arc::new(FanoutNotifier::from_config(&config.notify)?);
    info!("{} notification channel(s) active", notifier.channel_count());

    // 4. Admin accounts
    let provisioned =
        bootstrap::bootstrap_admins(users.as_ref(), wallets.as_ref(), &config.admin, clock.now()).await?;
    if provisioned > 0 {
        info!("Provisioned {} admin account(s)", provisioned);
    }

    let purge_cache = cache.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(CACHE_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            match purge_cache.purge_expired().await {
                Ok(0) => {}
                Ok(n) => tracing::debug!("Purged {} expired cache entries", n),
                Err(e) => tracing::warn!("Cache purge failed: {}", e),
            }
        }
    });

    let state = AppState {
        users: users.clone(),
        verifications: users,
        wallets,
        funding: Arc::new(SqliteFundingStore::new(db.clone())),
        referrals: Arc::new(SqliteReferralStore::new(db.clone())),
        notifications: Arc::new(SqliteNotificationStore::new(db.clone())),
        distribution: Arc::new(SqliteDistributionStore::new(db.clone())),
        plans: Arc::new(SqlitePlanStore::new(db.clone())),
        commissions: Arc::new(SqliteCommissionStore::new(db)),
        notifier,
        cache,
        clock,
        app_config: config.clone(),
    };

    // 5. Serve
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    start_server(state, &bind_addr, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown signal received");
    })
    .await?;

    info!("TIC GLOBAL server stopped");
    Ok(())
}
