//! Public façade: cache-aside reads over the provider, indicator orchestration, and the
//! uniform response envelope.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::cache::{cache_key, CacheStats, CacheStore, KEY_NAMESPACE};
use crate::indicators::{self, IndicatorKind, IndicatorParams};
use crate::provider::{ProviderClient, ProviderError, ProviderErrorKind};
use crate::rate_limit::RateLimitSnapshot;
use crate::{
    format_date, today_utc, ApiError, ApiResponse, ErrorCode, HistoricalData, Interval, Quote,
    SearchResult, Symbol, TechnicalIndicator, ValidationError,
};

pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const DEFAULT_INDICATOR_PERIOD: usize = 14;

const INDICATOR_LOOKBACK_DAYS: i64 = 365;

/// Failure inside a service operation, before conversion to the envelope.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("no valid symbols provided")]
    NoValidSymbols,
    #[error("{0}")]
    InvalidParameters(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("unable to get historical data for indicator calculation: {0}")]
    NoData(String),
}

impl ServiceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(error) => match error {
                ValidationError::EmptySymbol | ValidationError::InvalidSymbol { .. } => {
                    ErrorCode::InvalidSymbol
                }
                ValidationError::EmptyQuery => ErrorCode::InvalidQuery,
                ValidationError::UnknownIndicator { .. } => ErrorCode::InvalidIndicator,
                ValidationError::InvalidInterval { .. }
                | ValidationError::ZeroLimit
                | ValidationError::InvalidDate { .. }
                | ValidationError::InvertedRange { .. } => ErrorCode::InvalidParameters,
            },
            Self::NoValidSymbols => ErrorCode::InvalidSymbol,
            Self::InvalidParameters(_) => ErrorCode::InvalidParameters,
            Self::Provider(error) if error.kind() == ProviderErrorKind::RateLimited => {
                ErrorCode::RateLimited
            }
            Self::Provider(_) => ErrorCode::ProviderError,
            Self::NoData(_) => ErrorCode::NoData,
        }
    }

    pub fn to_api_error(&self, symbol: Option<&str>) -> ApiError {
        let error = ApiError::new(self.code(), self.to_string());
        match symbol {
            Some(symbol) => error.with_symbol(symbol),
            None => error,
        }
    }
}

/// Point-in-time service statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    pub rate_limits: RateLimitSnapshot,
    pub cache: CacheStats,
    /// RFC 3339 UTC.
    pub timestamp: String,
}

/// Market data service. Cheap to share behind an `Arc`; every method takes `&self`.
pub struct MarketDataService {
    provider: Arc<ProviderClient>,
    cache: Arc<CacheStore>,
}

impl MarketDataService {
    pub fn new(provider: Arc<ProviderClient>, cache: Arc<CacheStore>) -> Self {
        Self { provider, cache }
    }

    pub fn provider(&self) -> &ProviderClient {
        &self.provider
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub async fn get_quote(&self, symbol: &str) -> ApiResponse<Quote> {
        let symbol = match Symbol::parse(symbol) {
            Ok(symbol) => symbol,
            Err(error) => return failure(ServiceError::from(error), Some(symbol)),
        };

        respond(self.quote(&symbol).await, Some(symbol.as_str()))
    }

    /// Invalid symbols are dropped; the call fails only when none remain. Results follow
    /// request order, and symbols the provider does not know are omitted.
    pub async fn get_quotes(&self, symbols: &[&str]) -> ApiResponse<Vec<Quote>> {
        let mut seen = HashSet::new();
        let valid: Vec<Symbol> = symbols
            .iter()
            .filter_map(|raw| match Symbol::parse(raw) {
                Ok(symbol) => Some(symbol),
                Err(error) => {
                    debug!(symbol = %raw, %error, "skipping invalid symbol");
                    None
                }
            })
            .filter(|symbol| seen.insert(symbol.clone()))
            .collect();

        if valid.is_empty() {
            return failure(ServiceError::NoValidSymbols, None);
        }

        respond(self.quotes(&valid).await, None)
    }

    pub async fn get_historical_data(
        &self,
        symbol: &str,
        start: Date,
        end: Date,
        interval: Interval,
    ) -> ApiResponse<HistoricalData> {
        let symbol = match Symbol::parse(symbol) {
            Ok(symbol) => symbol,
            Err(error) => return failure(ServiceError::from(error), Some(symbol)),
        };

        respond(
            self.historical(&symbol, start, end, interval).await,
            Some(symbol.as_str()),
        )
    }

    pub async fn search_stocks(&self, query: &str, limit: usize) -> ApiResponse<Vec<SearchResult>> {
        respond(self.search(query, limit).await, None)
    }

    /// Compute `kind` over the closing prices of the last year of daily bars.
    ///
    /// A series too short for `period` yields an empty indicator, not an error. `NO_DATA`
    /// is reserved for a failed historical fetch.
    pub async fn calculate_indicator(
        &self,
        symbol: &str,
        kind: &str,
        period: usize,
        params: Option<IndicatorParams>,
    ) -> ApiResponse<TechnicalIndicator> {
        let symbol = match Symbol::parse(symbol) {
            Ok(symbol) => symbol,
            Err(error) => return failure(ServiceError::from(error), Some(symbol)),
        };

        respond(
            self.indicator(&symbol, kind, period, params.unwrap_or_default())
                .await,
            Some(symbol.as_str()),
        )
    }

    /// Remove every cached entry for `symbol`, returning how many keys were deleted.
    pub async fn clear_symbol_cache(&self, symbol: &str) -> ApiResponse<u64> {
        let symbol = match Symbol::parse(symbol) {
            Ok(symbol) => symbol,
            Err(error) => return failure(ServiceError::from(error), Some(symbol)),
        };

        let exact = cache_key("*", &[symbol.as_str()]);
        let nested = cache_key("*", &[symbol.as_str(), "*"]);
        let removed = self.cache.delete_pattern(&exact).await + self.cache.delete_pattern(&nested).await;

        info!(symbol = %symbol, removed, "cleared symbol cache");
        ApiResponse::success(removed)
    }

    pub async fn clear_all_cache(&self) -> ApiResponse<u64> {
        let removed = self.cache.delete_pattern(&format!("{KEY_NAMESPACE}:*")).await;

        info!(removed, "cleared market data cache");
        ApiResponse::success(removed)
    }

    pub async fn get_service_stats(&self) -> ApiResponse<ServiceStats> {
        let now = OffsetDateTime::now_utc();
        let timestamp = now
            .format(&Rfc3339)
            .unwrap_or_else(|_| now.unix_timestamp().to_string());

        ApiResponse::success(ServiceStats {
            rate_limits: self.provider.rate_limit_snapshot(),
            cache: self.cache.stats().await,
            timestamp,
        })
    }

    async fn quote(&self, symbol: &Symbol) -> Result<Quote, ServiceError> {
        let key = quote_key(symbol);
        if let Some(quote) = self.cache.get::<Quote>(&key).await {
            return Ok(quote);
        }

        let quote = self.provider.get_quote(symbol).await?;
        self.cache
            .set(&key, &quote, Some(self.cache.config().real_time_ttl()))
            .await;
        Ok(quote)
    }

    async fn quotes(&self, symbols: &[Symbol]) -> Result<Vec<Quote>, ServiceError> {
        let mut slots: Vec<Option<Quote>> = Vec::with_capacity(symbols.len());
        let mut misses: Vec<Symbol> = Vec::new();

        for symbol in symbols {
            let cached = self.cache.get::<Quote>(&quote_key(symbol)).await;
            if cached.is_none() {
                misses.push(symbol.clone());
            }
            slots.push(cached);
        }

        if !misses.is_empty() {
            debug!(hits = symbols.len() - misses.len(), misses = misses.len(), "batch quote cache check");
            let fresh = self.provider.get_quotes(&misses).await?;
            let ttl = Some(self.cache.config().real_time_ttl());

            for quote in fresh {
                self.cache.set(&quote_key(&quote.symbol), &quote, ttl).await;
                if let Some(position) = symbols.iter().position(|symbol| *symbol == quote.symbol) {
                    slots[position] = Some(quote);
                }
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }

    async fn historical(
        &self,
        symbol: &Symbol,
        start: Date,
        end: Date,
        interval: Interval,
    ) -> Result<HistoricalData, ServiceError> {
        if start > end {
            return Err(ValidationError::InvertedRange {
                start: format_date(start),
                end: format_date(end),
            }
            .into());
        }

        let (from, to) = (format_date(start), format_date(end));
        let key = cache_key(
            "historical",
            &[symbol.as_str(), from.as_str(), to.as_str(), interval.as_str()],
        );
        if let Some(history) = self.cache.get::<HistoricalData>(&key).await {
            return Ok(history);
        }

        let history = self
            .provider
            .get_historical_data(symbol, start, end, interval)
            .await?;
        self.cache
            .set(&key, &history, Some(self.cache.config().ttl_for(interval)))
            .await;
        Ok(history)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, ServiceError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyQuery.into());
        }
        if limit == 0 {
            return Err(ValidationError::ZeroLimit.into());
        }

        let normalized = trimmed.to_lowercase();
        let limit_part = limit.to_string();
        let key = cache_key("search", &[normalized.as_str(), limit_part.as_str()]);
        if let Some(results) = self.cache.get::<Vec<SearchResult>>(&key).await {
            return Ok(results);
        }

        let results = self.provider.search_stocks(trimmed, limit).await?;
        self.cache
            .set(&key, &results, Some(self.cache.config().search_ttl()))
            .await;
        Ok(results)
    }

    async fn indicator(
        &self,
        symbol: &Symbol,
        kind: &str,
        period: usize,
        params: IndicatorParams,
    ) -> Result<TechnicalIndicator, ServiceError> {
        let kind: IndicatorKind = kind.parse()?;
        validate_indicator_params(kind, period, &params)?;

        let end = today_utc();
        let start = end - time::Duration::days(INDICATOR_LOOKBACK_DAYS);
        let history = self
            .historical(symbol, start, end, Interval::Daily)
            .await
            .map_err(|error| {
                warn!(symbol = %symbol, %error, "historical fetch failed for indicator");
                ServiceError::NoData(error.to_string())
            })?;

        let closes = history.closes();
        let (name, values) = match kind {
            IndicatorKind::Sma => (format!("SMA({period})"), indicators::sma(&closes, period)),
            IndicatorKind::Ema => (format!("EMA({period})"), indicators::ema(&closes, period)),
            IndicatorKind::Rsi => (format!("RSI({period})"), indicators::rsi(&closes, period)),
            IndicatorKind::Macd => {
                let (fast, slow, signal) = params.macd_periods();
                (String::from("MACD"), indicators::macd(&closes, fast, slow, signal).macd)
            }
            IndicatorKind::Bollinger => (
                format!("Bollinger Bands({period})"),
                indicators::bollinger_bands(&closes, period, params.bollinger_std_dev()).middle,
            ),
            IndicatorKind::Stochastic => (
                format!("Stochastic({period})"),
                indicators::stochastic(
                    &history.highs(),
                    &history.lows(),
                    &closes,
                    period,
                    params.stochastic_d_period(),
                )
                .k,
            ),
        };

        debug!(symbol = %symbol, indicator = %name, points = values.len(), "indicator computed");
        Ok(TechnicalIndicator::aligned(name, values, &history.dates()))
    }
}

fn validate_indicator_params(
    kind: IndicatorKind,
    period: usize,
    params: &IndicatorParams,
) -> Result<(), ServiceError> {
    if period == 0 {
        return Err(ServiceError::InvalidParameters(String::from(
            "indicator period must be greater than zero",
        )));
    }

    match kind {
        IndicatorKind::Macd => {
            let (fast, slow, signal) = params.macd_periods();
            if fast == 0 || signal == 0 || fast >= slow {
                return Err(ServiceError::InvalidParameters(format!(
                    "MACD requires 0 < fast < slow and signal > 0, got fast={fast} slow={slow} signal={signal}"
                )));
            }
        }
        IndicatorKind::Bollinger => {
            let std_dev = params.bollinger_std_dev();
            if !std_dev.is_finite() || std_dev <= 0.0 {
                return Err(ServiceError::InvalidParameters(format!(
                    "Bollinger standard deviation multiplier must be positive, got {std_dev}"
                )));
            }
        }
        IndicatorKind::Stochastic if params.stochastic_d_period() == 0 => {
            return Err(ServiceError::InvalidParameters(String::from(
                "stochastic %D period must be greater than zero",
            )));
        }
        _ => {}
    }

    Ok(())
}

fn quote_key(symbol: &Symbol) -> String {
    cache_key("quote", &[symbol.as_str()])
}

fn respond<T>(result: Result<T, ServiceError>, symbol: Option<&str>) -> ApiResponse<T> {
    match result {
        Ok(data) => ApiResponse::success(data),
        Err(error) => failure(error, symbol),
    }
}

fn failure<T>(error: ServiceError, symbol: Option<&str>) -> ApiResponse<T> {
    match error.code() {
        ErrorCode::ProviderError | ErrorCode::RateLimited | ErrorCode::NoData => {
            warn!(code = %error.code(), %error, "market data request failed");
        }
        _ => debug!(code = %error.code(), %error, "market data request rejected"),
    }
    ApiResponse::failure(error.to_api_error(symbol))
}
