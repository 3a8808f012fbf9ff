//! Startup configuration, read once from the process environment.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{
    BackendError, CacheBackend, CacheConfig, CacheSettings, CacheStore, RedisBackend,
};
use crate::http_client::{HttpAuth, HttpClient, ReqwestHttpClient};
use crate::provider::{ProviderClient, ProviderConfig};
use crate::{ConfigError, MarketDataService};

pub const REDIS_URL: &str = "REDIS_URL";
pub const CACHE_CONNECT_TIMEOUT_MS: &str = "MARKETLENS_CACHE_CONNECT_TIMEOUT_MS";
pub const CACHE_OP_TIMEOUT_MS: &str = "MARKETLENS_CACHE_OP_TIMEOUT_MS";
pub const CACHE_HEALTH_INTERVAL_MS: &str = "MARKETLENS_CACHE_HEALTH_INTERVAL_MS";
pub const TTL_REALTIME: &str = "MARKETLENS_TTL_REALTIME";
pub const TTL_DAILY: &str = "MARKETLENS_TTL_DAILY";
pub const TTL_HISTORICAL: &str = "MARKETLENS_TTL_HISTORICAL";
pub const TTL_SEARCH: &str = "MARKETLENS_TTL_SEARCH";
pub const PROVIDER_URL: &str = "MARKETLENS_PROVIDER_URL";
pub const SEARCH_URL: &str = "MARKETLENS_SEARCH_URL";
pub const PROVIDER_TIMEOUT_MS: &str = "MARKETLENS_PROVIDER_TIMEOUT_MS";
pub const RATE_PER_SECOND: &str = "MARKETLENS_RATE_PER_SECOND";
pub const RATE_PER_MINUTE: &str = "MARKETLENS_RATE_PER_MINUTE";
pub const RATE_PER_HOUR: &str = "MARKETLENS_RATE_PER_HOUR";
pub const YAHOO_COOKIE: &str = "YAHOO_COOKIE";
pub const YAHOO_CRUMB: &str = "YAHOO_CRUMB";

/// Everything needed to assemble a [`MarketDataService`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    pub provider: ProviderConfig,
    pub cache: CacheConfig,
    pub cache_settings: CacheSettings,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Unset or blank variables keep their
    /// defaults; malformed numbers are rejected.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(url) = var(REDIS_URL) {
            config.cache_settings.url = url;
        }
        if let Some(ms) = positive(&var, CACHE_CONNECT_TIMEOUT_MS)? {
            config.cache_settings.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = positive(&var, CACHE_OP_TIMEOUT_MS)? {
            config.cache_settings.op_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = positive(&var, CACHE_HEALTH_INTERVAL_MS)? {
            config.cache_settings.health_interval = Duration::from_millis(ms);
        }

        if let Some(seconds) = positive(&var, TTL_REALTIME)? {
            config.cache.real_time = seconds;
        }
        if let Some(seconds) = positive(&var, TTL_DAILY)? {
            config.cache.daily = seconds;
        }
        if let Some(seconds) = positive(&var, TTL_HISTORICAL)? {
            config.cache.historical = seconds;
        }
        if let Some(seconds) = positive(&var, TTL_SEARCH)? {
            config.cache.search_results = seconds;
        }

        if let Some(url) = var(PROVIDER_URL) {
            config.provider.quote_base_url = url;
        }
        if let Some(url) = var(SEARCH_URL) {
            config.provider.search_base_url = url;
        }
        if let Some(ms) = positive(&var, PROVIDER_TIMEOUT_MS)? {
            config.provider.timeout_ms = ms;
        }
        if let Some(limit) = positive(&var, RATE_PER_SECOND)? {
            config.provider.rate_limits.per_second = to_u32(RATE_PER_SECOND, limit)?;
        }
        if let Some(limit) = positive(&var, RATE_PER_MINUTE)? {
            config.provider.rate_limits.per_minute = to_u32(RATE_PER_MINUTE, limit)?;
        }
        if let Some(limit) = positive(&var, RATE_PER_HOUR)? {
            config.provider.rate_limits.per_hour = to_u32(RATE_PER_HOUR, limit)?;
        }
        if let Some(cookie) = var(YAHOO_COOKIE) {
            config.provider.auth = HttpAuth::Cookie(cookie);
        }
        config.provider.crumb = var(YAHOO_CRUMB);

        Ok(config)
    }

    pub fn redis_backend(&self) -> Result<RedisBackend, BackendError> {
        RedisBackend::open(&self.cache_settings.url, self.cache_settings.connect_timeout)
    }

    /// Assemble the service over the given transport and cache backend, making the
    /// initial cache connection attempt.
    pub async fn build(
        &self,
        http: Arc<dyn HttpClient>,
        backend: Arc<dyn CacheBackend>,
    ) -> MarketDataService {
        let provider = ProviderClient::new(http, self.provider.clone());
        let cache = CacheStore::open(backend, self.cache, self.cache_settings.clone()).await;
        MarketDataService::new(Arc::new(provider), Arc::new(cache))
    }

    /// Reqwest transport configured with this config's user agent.
    pub fn http_client(&self) -> Arc<dyn HttpClient> {
        Arc::new(ReqwestHttpClient::new(&self.provider.user_agent))
    }
}

fn positive(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = var(name) else {
        return Ok(None);
    };

    let value: u64 = raw
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { name, value: raw })?;
    if value == 0 {
        return Err(ConfigError::ZeroValue { name });
    }
    Ok(Some(value))
}

fn to_u32(name: &'static str, value: u64) -> Result<u32, ConfigError> {
    u32::try_from(value).map_err(|_| ConfigError::InvalidNumber {
        name,
        value: value.to_string(),
    })
}
