use std::sync::Arc;

use serde_json::Value;
use time::{Date, OffsetDateTime};
use tracing::debug;

use super::normalize::{
    column, find_quote, quote_from_object, quote_objects, search_result_from_object, to_volume,
};
use super::{ProviderConfig, ProviderError};
use crate::http_client::{HttpClient, HttpRequest};
use crate::rate_limit::{RateLimitSnapshot, RateLimiter};
use crate::{
    date_from_unix, format_date, unix_midnight, HistoricalData, Interval, Ohlcv, Quote,
    SearchResult, Symbol,
};

const SECONDS_PER_DAY: i64 = 86_400;

/// Upstream market data client. Owns the rate-limit counters; every public call is one
/// limiter check followed by at most one HTTP request.
pub struct ProviderClient {
    http: Arc<dyn HttpClient>,
    config: ProviderConfig,
    limiter: RateLimiter,
}

impl ProviderClient {
    pub fn new(http: Arc<dyn HttpClient>, config: ProviderConfig) -> Self {
        let limiter = RateLimiter::new(config.rate_limits);
        Self {
            http,
            config,
            limiter,
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn rate_limit_snapshot(&self) -> RateLimitSnapshot {
        self.limiter.snapshot()
    }

    pub fn reset_rate_limits(&self) {
        self.limiter.reset();
    }

    pub async fn get_quote(&self, symbol: &Symbol) -> Result<Quote, ProviderError> {
        self.admit()?;
        let payload = self.fetch_json(self.quote_url(std::slice::from_ref(symbol))).await?;
        let entries = quote_objects(&payload)
            .ok_or_else(|| ProviderError::malformed("quote payload has no quote list"))?;

        let object = find_quote(&entries, symbol)
            .ok_or_else(|| ProviderError::no_data(format!("no data found for symbol: {symbol}")))?;
        Ok(quote_from_object(symbol.clone(), object, now_unix()))
    }

    /// One limiter check and one request for the whole batch. Symbols the provider does
    /// not return are left out of the result.
    pub async fn get_quotes(&self, symbols: &[Symbol]) -> Result<Vec<Quote>, ProviderError> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        self.admit()?;
        let payload = self.fetch_json(self.quote_url(symbols)).await?;
        let entries = quote_objects(&payload)
            .ok_or_else(|| ProviderError::malformed("quote payload has no quote list"))?;

        let now = now_unix();
        let quotes: Vec<Quote> = symbols
            .iter()
            .filter_map(|symbol| {
                find_quote(&entries, symbol).map(|object| quote_from_object(symbol.clone(), object, now))
            })
            .collect();

        debug!(
            requested = symbols.len(),
            returned = quotes.len(),
            "provider batch quote"
        );
        Ok(quotes)
    }

    /// Bars from `start` through `end` inclusive.
    pub async fn get_historical_data(
        &self,
        symbol: &Symbol,
        start: Date,
        end: Date,
        interval: Interval,
    ) -> Result<HistoricalData, ProviderError> {
        self.admit()?;
        let url = format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval={}{}",
            self.config.quote_base_url.trim_end_matches('/'),
            urlencoding::encode(symbol.as_str()),
            unix_midnight(start),
            unix_midnight(end) + SECONDS_PER_DAY,
            interval.as_str(),
            self.crumb_param(),
        );
        let payload = self.fetch_json(url).await?;
        let bars = parse_chart(&payload, symbol)?;

        Ok(HistoricalData::new(symbol.clone(), bars))
    }

    /// Matches for a free-text query, truncated to `limit`. Zero matches is not an error.
    pub async fn search_stocks(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        self.admit()?;
        let url = format!(
            "{}/v1/finance/search?q={}&quotesCount={limit}&newsCount=0",
            self.config.search_base_url.trim_end_matches('/'),
            urlencoding::encode(query),
        );
        let payload = self.fetch_json(url).await?;

        let Some(quotes) = payload.get("quotes").and_then(Value::as_array) else {
            return Ok(Vec::new());
        };

        Ok(quotes
            .iter()
            .filter_map(Value::as_object)
            .filter_map(search_result_from_object)
            .take(limit)
            .collect())
    }

    fn admit(&self) -> Result<(), ProviderError> {
        self.limiter.check().map_err(|window| {
            ProviderError::rate_limited(format!(
                "rate limit exceeded for the current {} window",
                window.as_str()
            ))
        })
    }

    fn quote_url(&self, symbols: &[Symbol]) -> String {
        let joined = symbols
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(",");

        format!(
            "{}/v7/finance/quote?symbols={}{}",
            self.config.quote_base_url.trim_end_matches('/'),
            urlencoding::encode(&joined),
            self.crumb_param(),
        )
    }

    fn crumb_param(&self) -> String {
        self.config
            .crumb
            .as_deref()
            .map(|crumb| format!("&crumb={}", urlencoding::encode(crumb)))
            .unwrap_or_default()
    }

    async fn fetch_json(&self, url: String) -> Result<Value, ProviderError> {
        let request = HttpRequest::get(url)
            .with_header("accept", "application/json")
            .with_auth(&self.config.auth)
            .with_timeout_ms(self.config.timeout_ms);
        debug!(url = %request.url, "provider request");

        let response = self.http.execute(request).await.map_err(|error| {
            if error.timed_out() {
                ProviderError::transport(format!("provider request timed out: {}", error.message()))
            } else {
                ProviderError::transport(format!("provider transport error: {}", error.message()))
            }
        })?;

        if response.status == 404 {
            return Err(ProviderError::no_data("provider has no data for this request"));
        }
        if !response.is_success() {
            return Err(ProviderError::transport(format!(
                "provider returned status {}",
                response.status
            )));
        }

        serde_json::from_str(&response.body).map_err(|error| {
            ProviderError::malformed(format!("failed to parse provider response: {error}"))
        })
    }
}

fn parse_chart(payload: &Value, symbol: &Symbol) -> Result<Vec<Ohlcv>, ProviderError> {
    let chart = payload
        .get("chart")
        .ok_or_else(|| ProviderError::malformed("chart payload is missing 'chart'"))?;

    let Some(result) = chart.get("result").and_then(Value::as_array).and_then(|r| r.first()) else {
        let reason = chart
            .get("error")
            .and_then(|error| error.get("description"))
            .and_then(Value::as_str)
            .unwrap_or("empty result");
        return Err(ProviderError::no_data(format!(
            "no historical data found for symbol: {symbol} ({reason})"
        )));
    };

    let timestamps: Vec<i64> = result
        .get("timestamp")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default();
    if timestamps.is_empty() {
        return Err(ProviderError::no_data(format!(
            "no historical data found for symbol: {symbol}"
        )));
    }

    let quote = result
        .get("indicators")
        .and_then(|indicators| indicators.get("quote"))
        .and_then(Value::as_array)
        .and_then(|quotes| quotes.first());
    let field = |name: &str| column(quote.and_then(|q| q.get(name)), timestamps.len());

    let (open, high, low, close, volume) = (
        field("open"),
        field("high"),
        field("low"),
        field("close"),
        field("volume"),
    );

    Ok(timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, seconds)| {
            let day = date_from_unix(*seconds)?;
            Some(Ohlcv {
                time: format_date(day),
                open: open[i],
                high: high[i],
                low: low[i],
                close: close[i],
                volume: to_volume(volume[i]),
            })
        })
        .collect())
}

fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}
