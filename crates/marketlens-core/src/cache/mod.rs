//! # Cache Store
//!
//! Fail-soft adapter over a TTL-capable key-value backend. Values are stored as JSON.
//!
//! | Operation | Result when the backend is down |
//! |-----------|---------------------------------|
//! | [`CacheStore::get`] / [`CacheStore::lookup`] | `None` / [`CacheLookup::Unavailable`] |
//! | [`CacheStore::set`], [`CacheStore::delete`], [`CacheStore::exists`] | `false` |
//! | [`CacheStore::delete_pattern`] | `0` |
//! | [`CacheStore::get_ttl`] | `-1` |
//!
//! A connected flag gates every operation. It is set by [`CacheStore::connect`], cleared
//! when the backend reports itself unreachable, and kept current by a health monitor that
//! [`CacheStore::open`] starts and the store aborts on drop. No operation retries inline.

mod backend;
mod memory;
mod redis_backend;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub use self::backend::{BackendError, BackendFuture, CacheBackend};
pub use self::memory::InMemoryBackend;
pub use self::redis_backend::RedisBackend;

use crate::Interval;

/// Namespace shared by every key this crate writes.
pub const KEY_NAMESPACE: &str = "market_data";

pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
pub const DEFAULT_REAL_TIME_TTL_SECS: u64 = 60;
pub const DEFAULT_DAILY_TTL_SECS: u64 = 86_400;
pub const DEFAULT_HISTORICAL_TTL_SECS: u64 = 604_800;
pub const DEFAULT_SEARCH_TTL_SECS: u64 = 3_600;

/// TTL table, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    pub real_time: u64,
    pub daily: u64,
    pub historical: u64,
    pub search_results: u64,
}

impl CacheConfig {
    pub const fn real_time_ttl(&self) -> Duration {
        Duration::from_secs(self.real_time)
    }

    pub const fn search_ttl(&self) -> Duration {
        Duration::from_secs(self.search_results)
    }

    /// Daily bars use the daily TTL; coarser bars change rarely and use the historical one.
    pub const fn ttl_for(&self, interval: Interval) -> Duration {
        match interval {
            Interval::Daily => Duration::from_secs(self.daily),
            Interval::Weekly | Interval::Monthly => Duration::from_secs(self.historical),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            real_time: DEFAULT_REAL_TIME_TTL_SECS,
            daily: DEFAULT_DAILY_TTL_SECS,
            historical: DEFAULT_HISTORICAL_TTL_SECS,
            search_results: DEFAULT_SEARCH_TTL_SECS,
        }
    }
}

/// Connection settings for the cache backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub url: String,
    pub connect_timeout: Duration,
    pub op_timeout: Duration,
    pub health_interval: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            url: String::from(DEFAULT_REDIS_URL),
            connect_timeout: Duration::from_secs(5),
            op_timeout: Duration::from_secs(2),
            health_interval: Duration::from_secs(30),
        }
    }
}

/// Outcome of a typed cache read. Callers fall through to the source of truth on both
/// `Miss` and `Unavailable`.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup<T> {
    Hit(T),
    Miss,
    Unavailable,
}

impl<T> CacheLookup<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Hit(value) => Some(value),
            Self::Miss | Self::Unavailable => None,
        }
    }

    pub const fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

/// Connectivity and backend statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub connected: bool,
    /// Raw `INFO memory` text.
    pub memory: Option<String>,
    /// Raw `INFO keyspace` text.
    pub keyspace: Option<String>,
    pub config: CacheConfig,
}

/// `market_data:<prefix>:<parts joined by ':'>`.
pub fn cache_key(prefix: &str, parts: &[&str]) -> String {
    let mut key = format!("{KEY_NAMESPACE}:{prefix}");
    for part in parts {
        key.push(':');
        key.push_str(part);
    }
    key
}

pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    connected: Arc<AtomicBool>,
    config: CacheConfig,
    settings: CacheSettings,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl CacheStore {
    /// A store that starts disconnected; call [`CacheStore::connect`] to bring it up.
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheConfig, settings: CacheSettings) -> Self {
        Self {
            backend,
            connected: Arc::new(AtomicBool::new(false)),
            config,
            settings,
            monitor: Mutex::new(None),
        }
    }

    /// Build a store, make the initial connection attempt and start the health monitor.
    pub async fn open(
        backend: Arc<dyn CacheBackend>,
        config: CacheConfig,
        settings: CacheSettings,
    ) -> Self {
        let store = Self::new(backend, config, settings);
        store.connect().await;
        store.watch();
        store
    }

    pub fn generate_key(prefix: &str, parts: &[&str]) -> String {
        cache_key(prefix, parts)
    }

    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Ping the backend within the connect timeout and record the outcome.
    pub async fn connect(&self) -> bool {
        let healthy = self.probe().await;
        self.record_health(healthy);
        healthy
    }

    /// Start the health monitor unless one is already running for this store.
    pub fn watch(&self) {
        let mut monitor = self.monitor.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if monitor.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        *monitor = Some(self.spawn_health_monitor());
    }

    /// Periodically ping the backend and update the connected flag.
    fn spawn_health_monitor(&self) -> JoinHandle<()> {
        let backend = Arc::clone(&self.backend);
        let connected = Arc::clone(&self.connected);
        let settings = self.settings.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(settings.health_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let healthy = matches!(
                    tokio::time::timeout(settings.connect_timeout, backend.ping()).await,
                    Ok(Ok(()))
                );
                transition(&connected, healthy);
            }
        })
    }

    pub async fn lookup<T: DeserializeOwned>(&self, key: &str) -> CacheLookup<T> {
        let Some(raw) = self.run("get", key, self.backend.get(key)).await else {
            return CacheLookup::Unavailable;
        };
        let Some(raw) = raw else {
            debug!(key, "cache miss");
            return CacheLookup::Miss;
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key, "cache hit");
                CacheLookup::Hit(value)
            }
            Err(error) => {
                warn!(key, %error, "discarding undecodable cache entry");
                CacheLookup::Miss
            }
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.lookup(key).await.into_option()
    }

    /// Store `value` as JSON. Without a TTL the entry never expires.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> bool {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(error) => {
                warn!(key, %error, "failed to encode cache entry");
                return false;
            }
        };

        self.run("set", key, self.backend.set(key, encoded, ttl))
            .await
            .is_some()
    }

    pub async fn delete(&self, key: &str) -> bool {
        let keys = [key.to_owned()];
        self.run("delete", key, self.backend.delete(&keys))
            .await
            .is_some()
    }

    /// Delete every key matching the glob `pattern`, returning how many were removed.
    pub async fn delete_pattern(&self, pattern: &str) -> u64 {
        let Some(keys) = self.run("keys", pattern, self.backend.keys(pattern)).await else {
            return 0;
        };
        if keys.is_empty() {
            return 0;
        }

        let removed = self
            .run("delete", pattern, self.backend.delete(&keys))
            .await
            .unwrap_or(0);
        debug!(pattern, removed, "deleted keys by pattern");
        removed
    }

    pub async fn exists(&self, key: &str) -> bool {
        self.run("exists", key, self.backend.exists(key))
            .await
            .unwrap_or(false)
    }

    /// Remaining lifetime in seconds as reported by the backend, or `-1` on failure.
    pub async fn get_ttl(&self, key: &str) -> i64 {
        self.run("ttl", key, self.backend.ttl(key))
            .await
            .unwrap_or(-1)
    }

    pub async fn stats(&self) -> CacheStats {
        let memory = self.run("info", "memory", self.backend.info("memory")).await;
        let keyspace = self
            .run("info", "keyspace", self.backend.info("keyspace"))
            .await;

        CacheStats {
            connected: self.is_connected(),
            memory,
            keyspace,
            config: self.config,
        }
    }

    async fn probe(&self) -> bool {
        match tokio::time::timeout(self.settings.connect_timeout, self.backend.ping()).await {
            Ok(Ok(())) => true,
            Ok(Err(error)) => {
                warn!(%error, "cache connection failed");
                false
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.settings.connect_timeout.as_millis() as u64,
                    "cache connection timed out"
                );
                false
            }
        }
    }

    fn record_health(&self, healthy: bool) {
        transition(&self.connected, healthy);
    }

    async fn run<T>(&self, op: &'static str, key: &str, future: BackendFuture<'_, T>) -> Option<T> {
        if !self.is_connected() {
            debug!(op, key, "cache unavailable, skipping");
            return None;
        }

        match tokio::time::timeout(self.settings.op_timeout, future).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(error)) => {
                warn!(op, key, %error, "cache operation failed");
                if error.is_unavailable() {
                    self.record_health(false);
                }
                None
            }
            Err(_) => {
                warn!(op, key, "cache operation timed out");
                None
            }
        }
    }
}

impl Drop for CacheStore {
    fn drop(&mut self) {
        let monitor = self
            .monitor
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = monitor.take() {
            handle.abort();
        }
    }
}

fn transition(connected: &AtomicBool, healthy: bool) {
    let was_connected = connected.swap(healthy, Ordering::Relaxed);
    match (was_connected, healthy) {
        (false, true) => info!("cache connected"),
        (true, false) => warn!("cache disconnected"),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_join_parts_under_namespace() {
        assert_eq!(cache_key("quote", &["AAPL"]), "market_data:quote:AAPL");
        assert_eq!(
            CacheStore::generate_key("historical", &["AAPL", "2024-01-01", "2024-12-31", "1d"]),
            "market_data:historical:AAPL:2024-01-01:2024-12-31:1d"
        );
        assert_eq!(cache_key("stats", &[]), "market_data:stats");
    }

    #[test]
    fn interval_selects_ttl() {
        let config = CacheConfig::default();

        assert_eq!(config.ttl_for(Interval::Daily), Duration::from_secs(86_400));
        assert_eq!(config.ttl_for(Interval::Weekly), Duration::from_secs(604_800));
        assert_eq!(config.real_time_ttl(), Duration::from_secs(60));
        assert_eq!(config.search_ttl(), Duration::from_secs(3_600));
    }

    #[tokio::test]
    async fn disconnected_store_short_circuits() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = CacheStore::new(backend.clone(), CacheConfig::default(), CacheSettings::default());

        assert!(!store.set("k", &1_u32, None).await);
        assert!(backend.is_empty().await);
        assert_eq!(store.lookup::<u32>("k").await, CacheLookup::Unavailable);
        assert_eq!(store.get_ttl("k").await, -1);
    }

    #[tokio::test]
    async fn undecodable_entry_is_a_miss() {
        let backend = Arc::new(InMemoryBackend::new());
        backend
            .set("k", String::from("not json"), None)
            .await
            .expect("set");
        let store = CacheStore::open(backend, CacheConfig::default(), CacheSettings::default()).await;

        assert_eq!(store.lookup::<u32>("k").await, CacheLookup::Miss);
    }

    #[tokio::test]
    async fn backend_outage_clears_the_connected_flag() {
        let backend = Arc::new(InMemoryBackend::new());
        let store =
            CacheStore::open(backend.clone(), CacheConfig::default(), CacheSettings::default()).await;
        assert!(store.is_connected());

        backend.set_available(false);
        assert!(!store.exists("k").await);
        assert!(!store.is_connected());

        backend.set_available(true);
        assert!(store.connect().await);
        assert!(store.set("k", "v", Some(Duration::from_secs(30))).await);
        assert!(store.exists("k").await);
    }

    #[tokio::test]
    async fn opened_store_follows_backend_health_without_traffic() {
        let backend = Arc::new(InMemoryBackend::new());
        let settings = CacheSettings {
            connect_timeout: Duration::from_millis(50),
            health_interval: Duration::from_millis(10),
            ..CacheSettings::default()
        };
        let store = CacheStore::open(backend.clone(), CacheConfig::default(), settings).await;
        store.watch();

        backend.set_available(false);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!store.is_connected());

        backend.set_available(true);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(store.is_connected());
    }
}
