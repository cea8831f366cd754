use serde::{Deserialize, Serialize};
use std::time::Duration;
use tic_cache::mem::MemCache;
use tic_core::cache::port::{Cache, CacheExt};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct RevokedToken {
    jti: String,
    email: String,
}

#[tokio::test]
async fn test_mem_cache_raw_ops() {
    let cache = MemCache::new();
    let key = "raw_key";
    let value = vec![1, 2, 3, 4];

    // Store and read back
    cache.set_raw(key, value.clone(), None).await.unwrap();
    let result = cache.get_raw(key).await.unwrap().unwrap();
    assert_eq!(result, value);

    // Delete
    cache.del(key).await.unwrap();
    assert!(cache.get_raw(key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_mem_cache_typed_ops() {
    let cache = MemCache::new();
    let item = RevokedToken {
        jti: "3f2a".to_string(),
        email: "admin@ticgloballtd.com".to_string(),
    };

    cache.set("revoked:3f2a", &item, None).await.unwrap();
    let result: RevokedToken = cache.get("revoked:3f2a").await.unwrap().unwrap();
    assert_eq!(result, item);
    assert!(cache.contains("revoked:3f2a").await.unwrap());
    assert!(!cache.contains("revoked:other").await.unwrap());
}

#[tokio::test]
async fn test_mem_cache_entries_expire() {
    let cache = MemCache::new();
    cache
        .set_raw("short", vec![1], Some(Duration::from_millis(50)))
        .await
        .unwrap();
    cache
        .set_raw("long", vec![2], Some(Duration::from_secs(60)))
        .await
        .unwrap();
    cache.set_raw("forever", vec![3], None).await.unwrap();
    cache
        .set_raw("also_short", vec![4], Some(Duration::from_millis(50)))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(120)).await;

    // Expired entries are never returned, and reading drops them
    assert!(cache.get_raw("short").await.unwrap().is_none());
    assert_eq!(cache.len(), 3);

    assert_eq!(cache.purge_expired().await.unwrap(), 1);
    assert_eq!(cache.get_raw("long").await.unwrap(), Some(vec![2]));
    assert_eq!(cache.get_raw("forever").await.unwrap(), Some(vec![3]));
    assert_eq!(cache.len(), 2);
}
