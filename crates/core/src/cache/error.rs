use thiserror::Error;

/// # Summary
/// Key-value cache failures.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Serialize error: {0}")]
    Serialize(String),
    #[error("Deserialize error: {0}")]
    Deserialize(String),
    /// Backend failure
    #[error("Storage error: {0}")]
    Storage(String),
}
