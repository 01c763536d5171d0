//! Runs only when `TEST_REDIS_URL` points at a disposable Redis instance.

use db_facade::cache::CacheClient;
use std::time::Duration;

fn client() -> Option<CacheClient> {
    let url = std::env::var("TEST_REDIS_URL").ok()?;
    Some(CacheClient::new(&url).unwrap())
}

#[tokio::test]
async fn test_cache_set_get() {
    let Some(cache) = client() else {
        eprintln!("TEST_REDIS_URL not set, skipping");
        return;
    };

    cache.connect().await.unwrap();
    assert!(cache.is_connected().await);

    cache.set("db_facade:test:key", "value", None).await.unwrap();
    assert_eq!(
        cache.get("db_facade:test:key").await.unwrap().as_deref(),
        Some("value")
    );
    assert_eq!(cache.get("db_facade:test:missing").await.unwrap(), None);

    let mut handle = cache.acquire().await.unwrap();
    handle.ping().await.unwrap();

    cache.close().await;
    assert!(!cache.is_connected().await);
}

#[tokio::test]
async fn test_cache_expiry() {
    let Some(cache) = client() else {
        eprintln!("TEST_REDIS_URL not set, skipping");
        return;
    };

    cache
        .set("db_facade:test:ttl", "soon gone", Some(Duration::from_secs(1)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(cache.get("db_facade:test:ttl").await.unwrap(), None);
    cache.close().await;
}
