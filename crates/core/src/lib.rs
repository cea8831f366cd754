//! # `tic-core` - domain model
//!
//! Entities, ports (async traits) and domain errors of the TIC GLOBAL
//! platform. Infrastructure crates (`tic-store`, `tic-notify`, `tic-cache`)
//! implement the ports; `tic-api` only talks to them through `Arc<dyn ...>`.

pub mod cache;
pub mod commission;
pub mod common;
pub mod config;
pub mod distribution;
pub mod funding;
pub mod notify;
pub mod plan;
pub mod referral;
pub mod store;
pub mod user;
pub mod wallet;

#[cfg(feature = "test-utils")]
pub mod test_utils;
