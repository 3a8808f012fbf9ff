use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::backend::{BackendError, BackendFuture, CacheBackend};

impl From<RedisError> for BackendError {
    fn from(error: RedisError) -> Self {
        if error.is_io_error()
            || error.is_connection_dropped()
            || error.is_connection_refusal()
            || error.is_timeout()
        {
            Self::Unavailable(error.to_string())
        } else {
            Self::Command(error.to_string())
        }
    }
}

/// Redis-backed cache.
///
/// The connection is established on first use, bounded by the connect timeout, and then
/// shared; the connection manager reconnects by itself after drops.
pub struct RedisBackend {
    client: redis::Client,
    connect_timeout: Duration,
    manager: RwLock<Option<ConnectionManager>>,
}

impl RedisBackend {
    pub fn open(url: &str, connect_timeout: Duration) -> Result<Self, BackendError> {
        let client = redis::Client::open(url)
            .map_err(|error| BackendError::Command(format!("invalid redis url: {error}")))?;

        Ok(Self {
            client,
            connect_timeout,
            manager: RwLock::new(None),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, BackendError> {
        if let Some(manager) = self.manager.read().await.as_ref() {
            return Ok(manager.clone());
        }

        let mut slot = self.manager.write().await;
        if let Some(manager) = slot.as_ref() {
            return Ok(manager.clone());
        }

        debug!("opening redis connection");
        let manager = tokio::time::timeout(
            self.connect_timeout,
            self.client.get_connection_manager(),
        )
        .await
        .map_err(|_| {
            BackendError::Unavailable(format!(
                "redis connect timed out after {}ms",
                self.connect_timeout.as_millis()
            ))
        })??;

        info!("redis connection established");
        *slot = Some(manager.clone());
        Ok(manager)
    }
}

impl CacheBackend for RedisBackend {
    fn get<'a>(&'a self, key: &'a str) -> BackendFuture<'a, Option<String>> {
        Box::pin(async move {
            let mut conn = self.connection().await?;
            let value: Option<String> = conn.get(key).await?;
            Ok(value)
        })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl: Option<Duration>,
    ) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            let mut conn = self.connection().await?;
            let mut command = redis::cmd("SET");
            command.arg(key).arg(value);
            if let Some(ttl) = ttl {
                command.arg("EX").arg(ttl.as_secs().max(1));
            }
            let _: () = command.query_async(&mut conn).await?;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, keys: &'a [String]) -> BackendFuture<'a, u64> {
        Box::pin(async move {
            if keys.is_empty() {
                return Ok(0);
            }
            let mut conn = self.connection().await?;
            let removed: u64 = conn.del(keys).await?;
            Ok(removed)
        })
    }

    fn keys<'a>(&'a self, pattern: &'a str) -> BackendFuture<'a, Vec<String>> {
        Box::pin(async move {
            let mut conn = self.connection().await?;
            let keys: Vec<String> = conn.keys(pattern).await?;
            Ok(keys)
        })
    }

    fn exists<'a>(&'a self, key: &'a str) -> BackendFuture<'a, bool> {
        Box::pin(async move {
            let mut conn = self.connection().await?;
            let exists: bool = conn.exists(key).await?;
            Ok(exists)
        })
    }

    fn ttl<'a>(&'a self, key: &'a str) -> BackendFuture<'a, i64> {
        Box::pin(async move {
            let mut conn = self.connection().await?;
            let ttl: i64 = conn.ttl(key).await?;
            Ok(ttl)
        })
    }

    fn info<'a>(&'a self, section: &'a str) -> BackendFuture<'a, String> {
        Box::pin(async move {
            let mut conn = self.connection().await?;
            let text: String = redis::cmd("INFO").arg(section).query_async(&mut conn).await?;
            Ok(text)
        })
    }

    fn ping<'a>(&'a self) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            let mut conn = self.connection().await?;
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(())
        })
    }
}
