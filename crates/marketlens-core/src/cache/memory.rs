use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use glob::Pattern;
use tokio::sync::RwLock;

use super::backend::{BackendError, BackendFuture, CacheBackend};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

/// Process-local backend with Redis-like expiry and glob key matching.
///
/// Clones share the same map. [`InMemoryBackend::set_available`] simulates the backend
/// going away: while unavailable every command fails with
/// [`BackendError::Unavailable`].
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    available: Arc<AtomicBool>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn ensure_available(&self) -> Result<(), BackendError> {
        if self.available.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(BackendError::Unavailable(String::from(
                "in-memory backend switched offline",
            )))
        }
    }

    async fn live_entry(&self, key: &str) -> Option<Entry> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.is_live(Instant::now()))
            .cloned()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for InMemoryBackend {
    fn get<'a>(&'a self, key: &'a str) -> BackendFuture<'a, Option<String>> {
        Box::pin(async move {
            self.ensure_available()?;
            Ok(self.live_entry(key).await.map(|entry| entry.value))
        })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl: Option<Duration>,
    ) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            self.ensure_available()?;
            let now = Instant::now();
            let expires_at = ttl.map(|ttl| now + ttl);
            let mut entries = self.entries.write().await;
            entries.retain(|_, entry| entry.is_live(now));
            entries.insert(key.to_owned(), Entry { value, expires_at });
            Ok(())
        })
    }

    fn delete<'a>(&'a self, keys: &'a [String]) -> BackendFuture<'a, u64> {
        Box::pin(async move {
            self.ensure_available()?;
            let now = Instant::now();
            let mut entries = self.entries.write().await;
            let removed = keys
                .iter()
                .filter_map(|key| entries.remove(key))
                .filter(|entry| entry.is_live(now))
                .count();
            Ok(removed as u64)
        })
    }

    fn keys<'a>(&'a self, pattern: &'a str) -> BackendFuture<'a, Vec<String>> {
        Box::pin(async move {
            self.ensure_available()?;
            let pattern = Pattern::new(pattern)
                .map_err(|error| BackendError::Command(format!("invalid key pattern: {error}")))?;

            let now = Instant::now();
            let entries = self.entries.read().await;
            let mut keys: Vec<String> = entries
                .iter()
                .filter(|(key, entry)| entry.is_live(now) && pattern.matches(key))
                .map(|(key, _)| key.clone())
                .collect();
            keys.sort();
            Ok(keys)
        })
    }

    fn exists<'a>(&'a self, key: &'a str) -> BackendFuture<'a, bool> {
        Box::pin(async move {
            self.ensure_available()?;
            Ok(self.live_entry(key).await.is_some())
        })
    }

    fn ttl<'a>(&'a self, key: &'a str) -> BackendFuture<'a, i64> {
        Box::pin(async move {
            self.ensure_available()?;
            let ttl = match self.live_entry(key).await {
                None => -2,
                Some(Entry {
                    expires_at: None, ..
                }) => -1,
                Some(Entry {
                    expires_at: Some(expires_at),
                    ..
                }) => {
                    let remaining = expires_at.saturating_duration_since(Instant::now());
                    i64::try_from(remaining.as_secs()).unwrap_or(i64::MAX)
                }
            };
            Ok(ttl)
        })
    }

    fn info<'a>(&'a self, section: &'a str) -> BackendFuture<'a, String> {
        Box::pin(async move {
            self.ensure_available()?;
            let now = Instant::now();
            let entries = self.entries.read().await;
            let live: Vec<&Entry> = entries.values().filter(|entry| entry.is_live(now)).collect();

            let text = match section {
                "memory" => {
                    let bytes: usize = entries
                        .iter()
                        .map(|(key, entry)| key.len() + entry.value.len())
                        .sum();
                    format!("# Memory\r\nused_memory:{bytes}\r\n")
                }
                "keyspace" if live.is_empty() => String::from("# Keyspace\r\n"),
                "keyspace" => {
                    let expiring = live.iter().filter(|entry| entry.expires_at.is_some()).count();
                    format!(
                        "# Keyspace\r\ndb0:keys={},expires={expiring},avg_ttl=0\r\n",
                        live.len()
                    )
                }
                other => format!("# {other}\r\n"),
            };
            Ok(text)
        })
    }

    fn ping<'a>(&'a self) -> BackendFuture<'a, ()> {
        Box::pin(async move { self.ensure_available() })
    }
}
