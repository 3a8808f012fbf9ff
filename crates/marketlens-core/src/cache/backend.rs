use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

/// Failure reported by a cache backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend cannot be reached; the store marks itself disconnected.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache command failed: {0}")]
    Command(String),
}

impl BackendError {
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BackendError>> + Send + 'a>>;

/// TTL-capable key-value store with Redis semantics.
///
/// `ttl` follows Redis: `-2` for a missing key, `-1` for a key without expiry. `keys`
/// takes a glob pattern where `*` also matches `:`.
pub trait CacheBackend: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BackendFuture<'a, Option<String>>;

    /// Store `value`, expiring after `ttl` when given.
    fn set<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl: Option<Duration>,
    ) -> BackendFuture<'a, ()>;

    /// Remove `keys`, returning how many existed.
    fn delete<'a>(&'a self, keys: &'a [String]) -> BackendFuture<'a, u64>;

    fn keys<'a>(&'a self, pattern: &'a str) -> BackendFuture<'a, Vec<String>>;

    fn exists<'a>(&'a self, key: &'a str) -> BackendFuture<'a, bool>;

    fn ttl<'a>(&'a self, key: &'a str) -> BackendFuture<'a, i64>;

    /// Raw `INFO <section>` text.
    fn info<'a>(&'a self, section: &'a str) -> BackendFuture<'a, String>;

    fn ping<'a>(&'a self) -> BackendFuture<'a, ()>;
}
