//! # `tic-store` - SQLite persistence
//!
//! One `tic.db` file holds every table. All stores share a [`db::Database`]
//! handle; money-moving operations go through the crate-private ledger so
//! the balance update and its ledger rows commit together.

pub mod commission;
pub mod config;
pub mod db;
pub mod distribution;
pub mod funding;
mod ledger;
pub mod notification;
pub mod plan;
pub mod referral;
pub mod user;
pub mod wallet;

pub use commission::SqliteCommissionStore;
pub use db::Database;
pub use distribution::SqliteDistributionStore;
pub use funding::SqliteFundingStore;
pub use notification::SqliteNotificationStore;
pub use plan::SqlitePlanStore;
pub use referral::SqliteReferralStore;
pub use user::SqliteUserStore;
pub use wallet::SqliteWalletStore;
