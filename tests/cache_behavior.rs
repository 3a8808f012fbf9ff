//! Behaviour tests for the cache store: typed round-trips, expiry, and fail-soft handling
//! of an unreachable backend.

use std::sync::Arc;
use std::time::Duration;

use marketlens_core::{
    CacheBackend, CacheConfig, CacheLookup, CacheSettings, CacheStore, InMemoryBackend, Interval,
    RedisBackend,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Snapshot {
    symbol: String,
    closes: Vec<f64>,
}

fn snapshot() -> Snapshot {
    Snapshot {
        symbol: String::from("AAPL"),
        closes: vec![189.5, 190.25, 188.0],
    }
}

fn fast_settings() -> CacheSettings {
    CacheSettings {
        connect_timeout: Duration::from_millis(200),
        op_timeout: Duration::from_millis(200),
        health_interval: Duration::from_millis(20),
        ..CacheSettings::default()
    }
}

async fn store_over(backend: Arc<InMemoryBackend>) -> CacheStore {
    CacheStore::open(backend, CacheConfig::default(), fast_settings()).await
}

#[tokio::test]
async fn when_a_value_is_stored_the_system_returns_an_equal_value() {
    // Given: A reachable cache
    let store = store_over(Arc::new(InMemoryBackend::new())).await;
    let key = CacheStore::generate_key("snapshot", &["AAPL", "1d"]);

    // When: A structured value is written and read back
    assert!(store.set(&key, &snapshot(), Some(Duration::from_secs(60))).await);
    let restored: Option<Snapshot> = store.get(&key).await;

    // Then: The value round-trips under the namespaced key
    assert_eq!(key, "market_data:snapshot:AAPL:1d");
    assert_eq!(restored, Some(snapshot()));
    assert!(store.exists(&key).await);
}

#[tokio::test]
async fn when_an_entry_expires_the_system_reports_a_miss() {
    // Given: An entry with a very short lifetime
    let store = store_over(Arc::new(InMemoryBackend::new())).await;
    store
        .set("market_data:quote:AAPL", &snapshot(), Some(Duration::from_millis(30)))
        .await;

    // When: The lifetime elapses
    tokio::time::sleep(Duration::from_millis(80)).await;

    // Then: Lookups miss and the key is reported missing
    let lookup: CacheLookup<Snapshot> = store.lookup("market_data:quote:AAPL").await;
    assert!(matches!(lookup, CacheLookup::Miss));
    assert_eq!(store.get_ttl("market_data:quote:AAPL").await, -2);
}

#[tokio::test]
async fn when_no_ttl_is_given_the_system_keeps_the_entry_indefinitely() {
    // Given: A reachable cache
    let store = store_over(Arc::new(InMemoryBackend::new())).await;

    // When: A value is stored without a TTL
    store.set("market_data:pinned", &snapshot(), None).await;

    // Then: The backend reports no expiry
    assert_eq!(store.get_ttl("market_data:pinned").await, -1);
}

#[tokio::test]
async fn when_a_cached_payload_is_corrupt_the_system_treats_it_as_a_miss() {
    // Given: A key holding text that is not the expected shape
    let backend = Arc::new(InMemoryBackend::new());
    backend
        .set("market_data:quote:AAPL", String::from("not json"), None)
        .await
        .expect("raw write");
    let store = store_over(backend).await;

    // When: It is read as a typed value
    let lookup: CacheLookup<Snapshot> = store.lookup("market_data:quote:AAPL").await;

    // Then: The caller sees a miss and the store stays connected
    assert!(matches!(lookup, CacheLookup::Miss));
    assert!(store.is_connected());
}

#[tokio::test]
async fn when_the_backend_goes_offline_the_system_degrades_without_failing() {
    // Given: A connected store holding one entry
    let backend = Arc::new(InMemoryBackend::new());
    let store = store_over(backend.clone()).await;
    store.set("market_data:quote:AAPL", &snapshot(), None).await;

    // When: The backend becomes unreachable
    backend.set_available(false);
    let lookup: CacheLookup<Snapshot> = store.lookup("market_data:quote:AAPL").await;

    // Then: Every operation reports a neutral result
    assert!(matches!(lookup, CacheLookup::Unavailable));
    assert!(!store.is_connected());
    assert!(!store.set("market_data:quote:MSFT", &snapshot(), None).await);
    assert!(!store.delete("market_data:quote:AAPL").await);
    assert!(!store.exists("market_data:quote:AAPL").await);
    assert_eq!(store.delete_pattern("market_data:*").await, 0);
    assert_eq!(store.get_ttl("market_data:quote:AAPL").await, -1);

    let stats = store.stats().await;
    assert!(!stats.connected);
    assert_eq!(stats.memory, None);
    assert_eq!(stats.keyspace, None);
}

#[tokio::test]
async fn when_the_backend_recovers_the_system_reconnects_on_the_next_health_check() {
    // Given: An opened store whose backend goes offline with no traffic in flight
    let backend = Arc::new(InMemoryBackend::new());
    let store = store_over(backend.clone()).await;
    backend.set_available(false);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!store.is_connected());

    // When: The backend comes back
    backend.set_available(true);
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Then: The store is connected again and serves writes
    assert!(store.is_connected());
    assert!(store.set("market_data:quote:AAPL", &snapshot(), None).await);
}

#[tokio::test]
async fn when_keys_are_deleted_by_pattern_the_system_counts_only_matches() {
    // Given: Entries under two prefixes
    let store = store_over(Arc::new(InMemoryBackend::new())).await;
    for key in [
        "market_data:quote:AAPL",
        "market_data:quote:MSFT",
        "market_data:search:apple:10",
    ] {
        store.set(key, &snapshot(), None).await;
    }

    // When: Quote keys are deleted by pattern
    let removed = store.delete_pattern("market_data:quote:*").await;

    // Then: Only those keys are removed
    assert_eq!(removed, 2);
    assert!(store.exists("market_data:search:apple:10").await);
    assert_eq!(store.delete_pattern("market_data:quote:*").await, 0);
}

#[tokio::test]
async fn when_redis_is_unreachable_the_system_starts_disconnected() {
    // Given: A Redis URL nothing listens on
    let backend = RedisBackend::open("redis://127.0.0.1:1/", Duration::from_millis(200))
        .expect("url parses");

    // When: The store is opened over it
    let store = CacheStore::open(Arc::new(backend), CacheConfig::default(), fast_settings()).await;

    // Then: It reports disconnected and reads miss without error
    assert!(!store.is_connected());
    let value: Option<Snapshot> = store.get("market_data:quote:AAPL").await;
    assert_eq!(value, None);
}

#[test]
fn when_ttls_are_chosen_the_system_follows_the_interval_table() {
    // Given: The default TTL table
    let config = CacheConfig::default();

    // Then: Daily bars live a day and coarser bars a week
    assert_eq!(config.real_time_ttl(), Duration::from_secs(60));
    assert_eq!(config.search_ttl(), Duration::from_secs(3_600));
    assert_eq!(config.ttl_for(Interval::Daily), Duration::from_secs(86_400));
    assert_eq!(config.ttl_for(Interval::Weekly), Duration::from_secs(604_800));
    assert_eq!(config.ttl_for(Interval::Monthly), Duration::from_secs(604_800));
}
