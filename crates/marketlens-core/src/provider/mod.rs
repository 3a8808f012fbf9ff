//! # Provider Client
//!
//! Rate-limited access to the upstream quote, chart and search endpoints, with payloads
//! normalized into [`Quote`](crate::Quote), [`HistoricalData`](crate::HistoricalData) and
//! [`SearchResult`](crate::SearchResult).
//!
//! | Operation | Upstream endpoint |
//! |-----------|-------------------|
//! | [`ProviderClient::get_quote`] | `/v7/finance/quote` |
//! | [`ProviderClient::get_quotes`] | `/v7/finance/quote` (one call per batch) |
//! | [`ProviderClient::get_historical_data`] | `/v8/finance/chart/{symbol}` |
//! | [`ProviderClient::search_stocks`] | `/v1/finance/search` |

mod client;
mod normalize;

use std::fmt::{Display, Formatter};

pub use client::ProviderClient;

use crate::http_client::{HttpAuth, DEFAULT_TIMEOUT_MS};
use crate::rate_limit::RateLimits;

pub const DEFAULT_QUOTE_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_SEARCH_BASE_URL: &str = "https://query2.finance.yahoo.com";
pub const DEFAULT_USER_AGENT: &str = concat!("marketlens/", env!("CARGO_PKG_VERSION"));

/// Upstream endpoints, credentials and limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub quote_base_url: String,
    pub search_base_url: String,
    pub timeout_ms: u64,
    pub rate_limits: RateLimits,
    pub auth: HttpAuth,
    /// Appended as `crumb=` to quote and chart requests when present.
    pub crumb: Option<String>,
    pub user_agent: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            quote_base_url: String::from(DEFAULT_QUOTE_BASE_URL),
            search_base_url: String::from(DEFAULT_SEARCH_BASE_URL),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            rate_limits: RateLimits::default(),
            auth: HttpAuth::None,
            crumb: None,
            user_agent: String::from(DEFAULT_USER_AGENT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The local limiter rejected the call before any request was sent.
    RateLimited,
    /// The provider answered but had nothing for the request.
    NoData,
    /// The payload did not have a recognised shape.
    Malformed,
    /// Timeout, connection failure or non-success status.
    Transport,
}

/// Structured provider failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    kind: ProviderErrorKind,
    message: String,
}

impl ProviderError {
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, message)
    }

    pub fn no_data(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::NoData, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Malformed, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transport, message)
    }

    fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> ProviderErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the same request may succeed later without changes.
    pub const fn retryable(&self) -> bool {
        matches!(
            self.kind,
            ProviderErrorKind::RateLimited | ProviderErrorKind::Transport
        )
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ProviderErrorKind::RateLimited => "provider.rate_limited",
            ProviderErrorKind::NoData => "provider.no_data",
            ProviderErrorKind::Malformed => "provider.malformed",
            ProviderErrorKind::Transport => "provider.transport",
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for ProviderError {}
