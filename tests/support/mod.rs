//! Shared fixtures for the behaviour suites: canned provider payloads and a service wired
//! to the offline transport and in-memory cache.

#![allow(dead_code)]

use std::sync::Arc;

use marketlens_core::{
    CacheConfig, CacheSettings, CacheStore, InMemoryBackend, MarketDataService, ProviderClient,
    ProviderConfig, RateLimits, ScriptedHttpClient,
};
use serde_json::json;

pub const QUOTE_PATH: &str = "/v7/finance/quote";
pub const CHART_PATH: &str = "/v8/finance/chart/";
pub const SEARCH_PATH: &str = "/v1/finance/search";

/// 2024-01-02 00:00 UTC.
pub const FIRST_BAR_UNIX: i64 = 1_704_153_600;

pub struct Harness {
    pub service: MarketDataService,
    pub http: Arc<ScriptedHttpClient>,
    pub backend: Arc<InMemoryBackend>,
}

pub fn generous_limits() -> RateLimits {
    RateLimits {
        per_second: 1_000,
        per_minute: 10_000,
        per_hour: 100_000,
    }
}

pub async fn harness(http: ScriptedHttpClient) -> Harness {
    harness_with_limits(http, generous_limits()).await
}

pub async fn harness_with_limits(http: ScriptedHttpClient, limits: RateLimits) -> Harness {
    let http = Arc::new(http);
    let backend = Arc::new(InMemoryBackend::new());
    let provider = ProviderClient::new(
        http.clone(),
        ProviderConfig {
            rate_limits: limits,
            ..ProviderConfig::default()
        },
    );
    let cache = CacheStore::open(
        backend.clone(),
        CacheConfig::default(),
        CacheSettings::default(),
    )
    .await;

    Harness {
        service: MarketDataService::new(Arc::new(provider), Arc::new(cache)),
        http,
        backend,
    }
}

pub fn quote_entry(symbol: &str, price: f64) -> serde_json::Value {
    json!({
        "symbol": symbol,
        "regularMarketPrice": price,
        "regularMarketChange": 1.25,
        "regularMarketChangePercent": 0.66,
        "regularMarketPreviousClose": price - 1.25,
        "regularMarketOpen": price - 0.5,
        "regularMarketDayHigh": price + 1.0,
        "regularMarketDayLow": price - 2.0,
        "regularMarketVolume": 48_000_000,
        "marketCap": 2.9e12,
        "regularMarketTime": FIRST_BAR_UNIX
    })
}

pub fn quote_body(quotes: &[(&str, f64)]) -> String {
    let result: Vec<_> = quotes
        .iter()
        .map(|(symbol, price)| quote_entry(symbol, *price))
        .collect();
    json!({ "quoteResponse": { "result": result, "error": null } }).to_string()
}

/// Daily chart payload with `closes.len()` bars starting on 2024-01-02.
pub fn chart_body(closes: &[f64]) -> String {
    let timestamps: Vec<i64> = (0..closes.len() as i64)
        .map(|day| FIRST_BAR_UNIX + day * 86_400)
        .collect();
    let opens: Vec<f64> = closes.iter().map(|close| close - 0.5).collect();
    let highs: Vec<f64> = closes.iter().map(|close| close + 1.0).collect();
    let lows: Vec<f64> = closes.iter().map(|close| close - 1.0).collect();
    let volumes: Vec<u64> = closes.iter().map(|_| 1_000_000).collect();

    json!({
        "chart": {
            "result": [{
                "meta": { "symbol": "AAPL" },
                "timestamp": timestamps,
                "indicators": { "quote": [{
                    "open": opens,
                    "high": highs,
                    "low": lows,
                    "close": closes,
                    "volume": volumes
                }]}
            }],
            "error": null
        }
    })
    .to_string()
}

pub fn rising_closes(count: usize) -> Vec<f64> {
    (0..count).map(|step| 100.0 + step as f64).collect()
}

pub fn search_body(hits: &[(&str, &str)]) -> String {
    let quotes: Vec<_> = hits
        .iter()
        .map(|(symbol, name)| {
            json!({
                "symbol": symbol,
                "shortname": name,
                "exchDisp": "NASDAQ",
                "typeDisp": "Equity"
            })
        })
        .collect();
    json!({ "quotes": quotes, "news": [] }).to_string()
}
