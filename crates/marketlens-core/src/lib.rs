//! # Marketlens Core
//!
//! Market data aggregation: quotes, historical bars and symbol search from an upstream
//! provider, shielded by a Redis-compatible cache, plus technical indicators computed
//! from the cached series.
//!
//! ## Overview
//!
//! - **Domain models** for quotes, OHLCV bars, search hits and indicator series
//! - **Indicator engine**: SMA, EMA, RSI, MACD, Bollinger Bands, Stochastic, trend,
//!   support/resistance and volatility as pure functions
//! - **Provider client** with a three-window rate limiter and payload normalization
//! - **Cache store** with typed, fail-soft operations and a TTL table
//! - **Aggregation service** returning a uniform success/error envelope
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Cache backends (Redis, in-memory) and the fail-soft store |
//! | [`config`] | Environment-driven service configuration |
//! | [`domain`] | Domain models and symbol/interval/date helpers |
//! | [`envelope`] | `ApiResponse` envelope and error codes |
//! | [`error`] | Validation and configuration errors |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`indicators`] | Technical indicator engine |
//! | [`provider`] | Upstream provider client |
//! | [`rate_limit`] | Fixed-window rate limiter |
//! | [`service`] | `MarketDataService` façade |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use marketlens_core::ServiceConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::from_env()?;
//!     let backend = Arc::new(config.redis_backend()?);
//!     let service = config.build(config.http_client(), backend).await;
//!
//!     let response = service.get_quote("aapl").await;
//!     if let Some(quote) = response.data {
//!         println!("{} {:.2}", quote.symbol, quote.price);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod http_client;
pub mod indicators;
pub mod provider;
pub mod rate_limit;
pub mod service;

pub use cache::{
    cache_key, BackendError, CacheBackend, CacheConfig, CacheLookup, CacheSettings, CacheStats,
    CacheStore, InMemoryBackend, RedisBackend,
};
pub use config::ServiceConfig;
pub use domain::{
    date_from_unix, format_date, is_valid_symbol, normalize_symbol, parse_date, today_utc,
    unix_midnight, HistoricalData, Interval, Ohlcv, Quote, SearchResult, Symbol,
    TechnicalIndicator,
};
pub use envelope::{ApiError, ApiResponse, ErrorCode};
pub use error::{ConfigError, ValidationError};
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient,
    ScriptedHttpClient,
};
pub use indicators::{IndicatorKind, IndicatorParams};
pub use provider::{ProviderClient, ProviderConfig, ProviderError, ProviderErrorKind};
pub use rate_limit::{RateLimitSnapshot, RateLimiter, RateLimits, RateWindow};
pub use service::{MarketDataService, ServiceError, ServiceStats};
