use crate::cache::error::CacheError;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;

/// # Summary
/// Domain-agnostic async key-value store with optional per-entry expiry.
///
/// # Invariants
/// - Works on raw bytes so the trait stays object safe.
/// - An expired entry is never returned by `get_raw`.
#[async_trait]
pub trait Cache: Send + Sync {
    /// # Summary
    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// # Arguments
    /// * `ttl` - lifetime of the entry; `None` keeps it until deleted.
    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), CacheError>;

    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn del(&self, key: &str) -> Result<(), CacheError>;

    /// Drops every expired entry. Returns how many were removed.
    async fn purge_expired(&self) -> Result<usize, CacheError>;
}

/// # Summary
/// JSON helpers over [`Cache`], implemented for every cache.
#[async_trait]
pub trait CacheExt: Cache {
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(value).map_err(|e| CacheError::Serialize(e.to_string()))?;
        self.set_raw(key, bytes, ttl).await
    }

    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get_raw(key).await? {
            Some(bytes) => {
                let val = serde_json::from_slice(&bytes)
                    .map_err(|e| CacheError::Deserialize(e.to_string()))?;
                Ok(Some(val))
            }
            None => Ok(None),
        }
    }

    async fn contains(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get_raw(key).await?.is_some())
    }
}

impl<T: Cache + ?Sized> CacheExt for T {}
