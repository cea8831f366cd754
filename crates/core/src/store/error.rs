use thiserror::Error;

/// # Summary
/// Storage-level error shared by the CRUD-style ports (users, referrals,
/// notifications, distributions).
///
/// # Invariants
/// - Messages may contain driver details; they are logged, never returned to
///   HTTP clients.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Driver or I/O failure
    #[error("Database error: {0}")]
    Database(String),
    #[error("Not found")]
    NotFound,
    /// Unique constraint hit (email already registered, code taken, ...)
    #[error("Duplicate entry: {0}")]
    Duplicate(String),
    /// Failed to open or migrate the database
    #[error("Initialization error: {0}")]
    InitError(String),
}
