use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tic_core::cache::error::CacheError;
use tic_core::cache::port::Cache;

/// Stored value plus its deadline.
struct Entry {
    expires_at: Option<Instant>,
    value: Vec<u8>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// # Summary
/// In-process cache on top of `DashMap`, with optional per-entry expiry.
///
/// # Invariants
/// - Every operation goes through the concurrent map; safe to share across
///   tasks behind an `Arc`.
/// - Expired entries are invisible to readers and dropped lazily on access
///   or by [`Cache::purge_expired`].
pub struct MemCache {
    storage: DashMap<String, Entry>,
}

impl MemCache {
    pub fn new() -> Self {
        Self {
            storage: DashMap::new(),
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

impl Default for MemCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for MemCache {
    /// # Summary
    /// Inserts or overwrites `key`.
    ///
    /// # Logic
    /// A `ttl` that cannot be represented as an `Instant` is stored without
    /// deadline.
    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), CacheError> {
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        self.storage
            .insert(key.to_string(), Entry { expires_at, value });
        Ok(())
    }

    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        if let Some(entry) = self.storage.get(key) {
            if !entry.is_expired(now) {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }
        // The read guard is released above; safe to remove now.
        self.storage.remove_if(key, |_, entry| entry.is_expired(now));
        Ok(None)
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.storage.remove(key);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = Instant::now();
        let before = self.storage.len();
        self.storage.retain(|_, entry| !entry.is_expired(now));
        Ok(before.saturating_sub(self.storage.len()))
    }
}
