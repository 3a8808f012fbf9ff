//! Behaviour tests for the market data service: what a caller observes through the
//! response envelope, with the provider and cache replaced by offline doubles.

mod support;

use std::sync::Arc;
use std::time::Duration;

use marketlens_core::{
    parse_date, CacheBackend, CacheSettings, ErrorCode, HttpError, InMemoryBackend,
    IndicatorParams, Interval, ProviderConfig, RateLimits, ScriptedHttpClient, ServiceConfig,
};

use support::{
    chart_body, generous_limits, harness, harness_with_limits, quote_body, rising_closes,
    search_body, CHART_PATH, QUOTE_PATH, SEARCH_PATH,
};

// =============================================================================
// Quotes
// =============================================================================

#[tokio::test]
async fn when_a_lowercase_symbol_is_requested_twice_the_system_serves_the_second_from_cache() {
    // Given: An empty cache and a provider that knows AAPL
    let h = harness(
        ScriptedHttpClient::new().respond_json(QUOTE_PATH, quote_body(&[("AAPL", 189.5)])),
    )
    .await;

    // When: The caller asks for "aapl" and then "AAPL"
    let first = h.service.get_quote("aapl").await;
    let second = h.service.get_quote("AAPL").await;

    // Then: Both succeed with the normalized symbol
    let first = first.into_result().expect("first quote");
    let second = second.into_result().expect("second quote");
    assert_eq!(first.symbol.as_str(), "AAPL");
    assert_eq!(first, second);

    // And: Only the first call reached the provider
    assert_eq!(h.http.calls_matching(QUOTE_PATH), 1);
    assert!(h.http.requests()[0].url.contains("symbols=AAPL"));
}

#[tokio::test]
async fn when_a_batch_contains_an_invalid_symbol_the_system_returns_only_valid_quotes() {
    // Given: A provider that answers for AAPL
    let h = harness(
        ScriptedHttpClient::new().respond_json(QUOTE_PATH, quote_body(&[("AAPL", 189.5)])),
    )
    .await;

    // When: The batch includes a malformed ticker
    let response = h.service.get_quotes(&["AAPL", "INVALID$$"]).await;

    // Then: The call succeeds and the malformed ticker is silently dropped
    assert!(response.success);
    let quotes = response.data.expect("quotes");
    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0].symbol.as_str(), "AAPL");
}

#[tokio::test]
async fn when_every_batch_symbol_is_invalid_the_system_reports_invalid_symbol() {
    // Given: A provider that must never be consulted
    let h = harness(ScriptedHttpClient::new()).await;

    // When: Every requested ticker is malformed
    let response = h.service.get_quotes(&["", "12345", "TOOLONGX"]).await;

    // Then: The envelope reports INVALID_SYMBOL without any provider traffic
    assert!(!response.success);
    assert_eq!(response.error_code(), Some(ErrorCode::InvalidSymbol));
    assert_eq!(h.http.call_count(), 0);
}

#[tokio::test]
async fn when_a_batch_is_partly_cached_the_system_fetches_only_the_misses_in_request_order() {
    // Given: MSFT is already cached and the provider knows both symbols
    let h = harness(
        ScriptedHttpClient::new().respond_json(
            QUOTE_PATH,
            quote_body(&[("AAPL", 189.5), ("MSFT", 410.0)]),
        ),
    )
    .await;
    h.service.get_quote("MSFT").await.into_result().expect("warm MSFT");

    // When: The caller asks for AAPL and MSFT together, with a duplicate
    let quotes = h
        .service
        .get_quotes(&["aapl", "MSFT", "AAPL"])
        .await
        .into_result()
        .expect("batch");

    // Then: Results follow request order without duplicates
    let symbols: Vec<&str> = quotes.iter().map(|quote| quote.symbol.as_str()).collect();
    assert_eq!(symbols, ["AAPL", "MSFT"]);

    // And: The second provider request asked only for the miss
    let requests = h.http.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].url.contains("symbols=AAPL"));
    assert!(!requests[1].url.contains("MSFT"));
}

#[tokio::test]
async fn when_the_provider_does_not_know_a_symbol_the_system_reports_no_data() {
    // Given: A provider whose quote list is empty
    let h = harness(ScriptedHttpClient::new().respond_json(QUOTE_PATH, quote_body(&[]))).await;

    // When: The caller asks for an unknown but well-formed ticker
    let response = h.service.get_quote("ZZZZ").await;

    // Then: The envelope carries NO_DATA and the symbol
    let error = response.error.expect("error");
    assert_eq!(error.code, ErrorCode::NoData);
    assert_eq!(error.symbol.as_deref(), Some("ZZZZ"));
}

#[tokio::test]
async fn when_two_cold_requests_race_the_system_serves_both_without_corrupting_counters() {
    // Given: A slow provider and an empty cache
    let h = harness(
        ScriptedHttpClient::new()
            .with_latency(Duration::from_millis(50))
            .respond_json(QUOTE_PATH, quote_body(&[("MSFT", 410.0)])),
    )
    .await;

    // When: Two callers ask for MSFT at the same time
    let (left, right) = tokio::join!(h.service.get_quote("MSFT"), h.service.get_quote("MSFT"));

    // Then: Both succeed with the same value
    let left = left.into_result().expect("left");
    let right = right.into_result().expect("right");
    assert_eq!(left.price, right.price);

    // And: Every admitted call was counted exactly once
    let calls = h.http.call_count() as u32;
    let snapshot = h.service.provider().rate_limit_snapshot();
    assert!((1..=2).contains(&calls));
    assert_eq!(snapshot.second, calls);
    assert_eq!(snapshot.minute, calls);
    assert_eq!(snapshot.hour, calls);

    // And: The cache holds the quote afterwards
    assert!(h.service.cache().exists("market_data:quote:MSFT").await);
}

#[tokio::test]
async fn when_the_per_second_budget_is_spent_the_system_reports_rate_limited() {
    // Given: A provider budget of one call per second
    let h = harness_with_limits(
        ScriptedHttpClient::new().respond_json(
            QUOTE_PATH,
            quote_body(&[("AAPL", 189.5), ("MSFT", 410.0)]),
        ),
        RateLimits {
            per_second: 1,
            per_minute: 100,
            per_hour: 1_000,
        },
    )
    .await;

    // When: Two different symbols are requested back to back
    let first = h.service.get_quote("AAPL").await;
    let second = h.service.get_quote("MSFT").await;

    // Then: The second is rejected before reaching the provider
    assert!(first.success);
    assert_eq!(second.error_code(), Some(ErrorCode::RateLimited));
    assert_eq!(h.http.call_count(), 1);

    // And: A cached symbol is still served while the budget is spent
    assert!(h.service.get_quote("AAPL").await.success);
}

#[tokio::test]
async fn when_the_provider_fails_the_system_reports_provider_error() {
    // Given: A provider whose transport is down
    let h = harness(ScriptedHttpClient::new().fail(QUOTE_PATH, HttpError::new("connection reset")))
        .await;

    // When: A quote is requested
    let response = h.service.get_quote("AAPL").await;

    // Then: The failure is reported as PROVIDER_ERROR
    assert_eq!(response.error_code(), Some(ErrorCode::ProviderError));
}

// =============================================================================
// Historical data
// =============================================================================

#[tokio::test]
async fn when_history_is_requested_the_system_caches_it_with_the_daily_ttl() {
    // Given: A provider with five daily bars
    let h = harness(
        ScriptedHttpClient::new().respond_json(CHART_PATH, chart_body(&rising_closes(5))),
    )
    .await;
    let start = parse_date("2024-01-02").expect("date");
    let end = parse_date("2024-01-06").expect("date");

    // When: The same range is requested twice
    let first = h
        .service
        .get_historical_data("aapl", start, end, Interval::Daily)
        .await
        .into_result()
        .expect("history");
    let second = h
        .service
        .get_historical_data("AAPL", start, end, Interval::Daily)
        .await
        .into_result()
        .expect("cached history");

    // Then: Bars come back ascending and the second call is served from cache
    assert_eq!(first.data.len(), 5);
    assert_eq!(first.data[0].time, "2024-01-02");
    assert_eq!(first, second);
    assert_eq!(h.http.calls_matching(CHART_PATH), 1);

    // And: The entry lives under its range key with at most a day to live
    let ttl = h
        .service
        .cache()
        .get_ttl("market_data:historical:AAPL:2024-01-02:2024-01-06:1d")
        .await;
    assert!(ttl > 0 && ttl <= 86_400, "unexpected ttl {ttl}");
}

#[tokio::test]
async fn when_weekly_history_is_requested_the_system_keys_it_apart_with_the_historical_ttl() {
    // Given: A provider with five bars, already cached for the daily interval
    let h = harness(
        ScriptedHttpClient::new().respond_json(CHART_PATH, chart_body(&rising_closes(5))),
    )
    .await;
    let start = parse_date("2024-01-02").expect("date");
    let end = parse_date("2024-01-30").expect("date");
    h.service
        .get_historical_data("AAPL", start, end, Interval::Daily)
        .await
        .into_result()
        .expect("daily history");

    // When: The same range is requested with weekly bars
    h.service
        .get_historical_data("AAPL", start, end, Interval::Weekly)
        .await
        .into_result()
        .expect("weekly history");

    // Then: The weekly request was not served from the daily entry
    assert_eq!(h.http.calls_matching(CHART_PATH), 2);
    assert_eq!(h.http.calls_matching("interval=1wk"), 1);

    // And: Each interval has its own key, the weekly one living up to a week
    let cache = h.service.cache();
    let daily = cache
        .get_ttl("market_data:historical:AAPL:2024-01-02:2024-01-30:1d")
        .await;
    let weekly = cache
        .get_ttl("market_data:historical:AAPL:2024-01-02:2024-01-30:1wk")
        .await;
    assert!(daily > 0 && daily <= 86_400, "unexpected daily ttl {daily}");
    assert!(weekly > 86_400 && weekly <= 604_800, "unexpected weekly ttl {weekly}");
}

#[tokio::test]
async fn when_the_range_is_inverted_the_system_rejects_it_before_fetching() {
    // Given: A start date after the end date
    let h = harness(ScriptedHttpClient::new()).await;
    let start = parse_date("2024-03-01").expect("date");
    let end = parse_date("2024-01-01").expect("date");

    // When: History is requested
    let response = h
        .service
        .get_historical_data("AAPL", start, end, Interval::Weekly)
        .await;

    // Then: INVALID_PARAMETERS without provider traffic
    assert_eq!(response.error_code(), Some(ErrorCode::InvalidParameters));
    assert_eq!(h.http.call_count(), 0);
}

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
async fn when_the_search_query_is_blank_the_system_reports_invalid_query() {
    // Given: Any service
    let h = harness(ScriptedHttpClient::new()).await;

    // When: The query is empty or whitespace
    let empty = h.service.search_stocks("", 10).await;
    let blank = h.service.search_stocks("   ", 10).await;

    // Then: Both are INVALID_QUERY
    assert_eq!(empty.error_code(), Some(ErrorCode::InvalidQuery));
    assert_eq!(blank.error_code(), Some(ErrorCode::InvalidQuery));
    assert_eq!(h.http.call_count(), 0);
}

#[tokio::test]
async fn when_the_same_query_differs_only_in_case_the_system_reuses_the_cached_results() {
    // Given: A provider with two matches for "apple"
    let h = harness(ScriptedHttpClient::new().respond_json(
        SEARCH_PATH,
        search_body(&[("AAPL", "Apple Inc."), ("APLE", "Apple Hospitality REIT")]),
    ))
    .await;

    // When: The query is repeated with different case and padding
    let first = h
        .service
        .search_stocks("Apple", 10)
        .await
        .into_result()
        .expect("search");
    let second = h
        .service
        .search_stocks("  apple ", 10)
        .await
        .into_result()
        .expect("cached search");

    // Then: The normalized results are reused
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].name, "Apple Inc.");
    assert_eq!(first[0].exchange, "NASDAQ");
    assert_eq!(first[0].instrument_type, "Equity");
    assert_eq!(first, second);
    assert_eq!(h.http.calls_matching(SEARCH_PATH), 1);
}

// =============================================================================
// Indicators
// =============================================================================

#[tokio::test]
async fn when_history_is_shorter_than_the_period_the_system_returns_an_empty_indicator() {
    // Given: Only ten daily closes are available
    let h = harness(
        ScriptedHttpClient::new().respond_json(CHART_PATH, chart_body(&rising_closes(10))),
    )
    .await;

    // When: A 20-period SMA is requested
    let response = h.service.calculate_indicator("AAPL", "sma", 20, None).await;

    // Then: The call succeeds with an empty series, not NO_DATA
    let indicator = response.into_result().expect("indicator");
    assert_eq!(indicator.name, "SMA(20)");
    assert!(indicator.values.is_empty());
    assert!(indicator.timestamps.is_empty());
}

#[tokio::test]
async fn when_enough_history_exists_the_system_aligns_values_with_trailing_dates() {
    // Given: Thirty rising daily closes
    let h = harness(
        ScriptedHttpClient::new().respond_json(CHART_PATH, chart_body(&rising_closes(30))),
    )
    .await;

    // When: A 5-period EMA and a Bollinger band are requested
    let ema = h
        .service
        .calculate_indicator("AAPL", "EMA", 5, None)
        .await
        .into_result()
        .expect("ema");
    let bollinger = h
        .service
        .calculate_indicator("AAPL", "bollinger", 20, None)
        .await
        .into_result()
        .expect("bollinger");

    // Then: Each series has one value per full window, ending on the last bar
    assert_eq!(ema.values.len(), 26);
    assert_eq!(ema.values.len(), ema.timestamps.len());
    assert_eq!(ema.timestamps.last(), Some(&String::from("2024-01-31")));
    assert_eq!(bollinger.name, "Bollinger Bands(20)");
    assert_eq!(bollinger.values.len(), 11);

    // And: The shared year of history was fetched once
    assert_eq!(h.http.calls_matching(CHART_PATH), 1);
}

#[tokio::test]
async fn when_macd_is_requested_the_system_uses_its_own_periods_and_aligns_the_line() {
    // Given: Thirty rising daily closes
    let h = harness(
        ScriptedHttpClient::new().respond_json(CHART_PATH, chart_body(&rising_closes(30))),
    )
    .await;
    let params = IndicatorParams {
        fast: Some(3),
        slow: Some(10),
        signal: Some(4),
        ..IndicatorParams::default()
    };

    // When: MACD is requested with custom periods and an unrelated period argument
    let custom = h
        .service
        .calculate_indicator("AAPL", "macd", 14, Some(params))
        .await
        .into_result()
        .expect("custom macd");
    let standard = h
        .service
        .calculate_indicator("AAPL", "MACD", 5, None)
        .await
        .into_result()
        .expect("standard macd");

    // Then: The line has one value per slow window, ending on the last bar
    assert_eq!(custom.name, "MACD");
    assert_eq!(custom.values.len(), 30 - 10 + 1);
    assert_eq!(custom.values.len(), custom.timestamps.len());
    assert_eq!(custom.timestamps.first(), Some(&String::from("2024-01-11")));
    assert_eq!(custom.timestamps.last(), Some(&String::from("2024-01-31")));

    // And: On a rising series the fast average stays above the slow one
    assert!(custom.values.iter().all(|value| *value > 0.0));

    // And: Without parameters the 12/26 defaults apply
    assert_eq!(standard.values.len(), 30 - 26 + 1);
    assert_eq!(standard.timestamps.last(), Some(&String::from("2024-01-31")));
}

#[tokio::test]
async fn when_stochastic_is_requested_the_system_reads_highs_and_lows_from_history() {
    // Given: Thirty rising closes whose bars span one point either side
    let h = harness(
        ScriptedHttpClient::new().respond_json(CHART_PATH, chart_body(&rising_closes(30))),
    )
    .await;

    // When: A 5-period stochastic is requested
    let indicator = h
        .service
        .calculate_indicator("AAPL", "stochastic", 5, None)
        .await
        .into_result()
        .expect("stochastic");

    // Then: %K has one value per full window, ending on the last bar
    assert_eq!(indicator.name, "Stochastic(5)");
    assert_eq!(indicator.values.len(), 30 - 5 + 1);
    assert_eq!(indicator.values.len(), indicator.timestamps.len());
    assert_eq!(indicator.timestamps.last(), Some(&String::from("2024-01-31")));

    // And: The range comes from the bar extremes, not the closes, so %K sits at 5/6
    for value in &indicator.values {
        assert!((value - 500.0 / 6.0).abs() < 1e-9, "unexpected %K {value}");
    }
}

#[tokio::test]
async fn when_the_historical_fetch_fails_the_system_reports_no_data_for_indicators() {
    // Given: A provider that errors on chart requests
    let h = harness(
        ScriptedHttpClient::new().fail(CHART_PATH, HttpError::timeout("deadline exceeded")),
    )
    .await;

    // When: An RSI is requested
    let response = h.service.calculate_indicator("AAPL", "rsi", 14, None).await;

    // Then: The envelope reports NO_DATA for the symbol
    let error = response.error.expect("error");
    assert_eq!(error.code, ErrorCode::NoData);
    assert_eq!(error.symbol.as_deref(), Some("AAPL"));
}

#[tokio::test]
async fn when_an_unknown_indicator_is_requested_the_system_reports_invalid_indicator() {
    // Given: Any service
    let h = harness(ScriptedHttpClient::new()).await;

    // When: An unsupported kind is requested
    let response = h.service.calculate_indicator("AAPL", "vwap", 14, None).await;

    // Then: INVALID_INDICATOR without fetching history
    assert_eq!(response.error_code(), Some(ErrorCode::InvalidIndicator));
    assert_eq!(h.http.call_count(), 0);
}

#[tokio::test]
async fn when_indicator_parameters_are_inconsistent_the_system_rejects_them_before_fetching() {
    // Given: Any service
    let h = harness(ScriptedHttpClient::new()).await;
    let inverted_macd = IndicatorParams {
        fast: Some(26),
        slow: Some(12),
        ..IndicatorParams::default()
    };

    // When: MACD has fast >= slow, or the period is zero
    let macd = h
        .service
        .calculate_indicator("AAPL", "macd", 14, Some(inverted_macd))
        .await;
    let zero = h.service.calculate_indicator("AAPL", "sma", 0, None).await;

    // Then: Both are INVALID_PARAMETERS and nothing is fetched
    assert_eq!(macd.error_code(), Some(ErrorCode::InvalidParameters));
    assert_eq!(zero.error_code(), Some(ErrorCode::InvalidParameters));
    assert_eq!(h.http.call_count(), 0);
}

// =============================================================================
// Cache management
// =============================================================================

#[tokio::test]
async fn when_the_cache_is_down_the_system_falls_through_to_the_provider() {
    // Given: A cache backend that has gone offline
    let h = harness(
        ScriptedHttpClient::new().respond_json(QUOTE_PATH, quote_body(&[("AAPL", 189.5)])),
    )
    .await;
    h.backend.set_available(false);

    // When: The same quote is requested twice
    let first = h.service.get_quote("AAPL").await;
    let second = h.service.get_quote("AAPL").await;

    // Then: Both succeed straight from the provider
    assert!(first.success && second.success);
    assert_eq!(h.http.calls_matching(QUOTE_PATH), 2);
    assert!(!h.service.cache().is_connected());
}

#[tokio::test]
async fn when_the_cache_recovers_the_assembled_service_uses_it_again() {
    // Given: A service assembled from configuration with a fast health check
    let http = Arc::new(
        ScriptedHttpClient::new().respond_json(QUOTE_PATH, quote_body(&[("AAPL", 189.5)])),
    );
    let backend = Arc::new(InMemoryBackend::new());
    let config = ServiceConfig {
        provider: ProviderConfig {
            rate_limits: generous_limits(),
            ..ProviderConfig::default()
        },
        cache_settings: CacheSettings {
            connect_timeout: Duration::from_millis(50),
            op_timeout: Duration::from_millis(50),
            health_interval: Duration::from_millis(10),
            ..CacheSettings::default()
        },
        ..ServiceConfig::default()
    };
    let service = config.build(http.clone(), backend.clone()).await;

    // When: The backend drops during a request and later comes back
    backend.set_available(false);
    assert!(service.get_quote("AAPL").await.success);
    assert!(!service.cache().is_connected());
    backend.set_available(true);
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Then: The cache is connected again without any caller reconnecting it
    assert!(service.cache().is_connected());

    // And: The next quote is stored and the one after is served from cache
    assert!(service.get_quote("AAPL").await.success);
    assert!(service.get_quote("AAPL").await.success);
    assert_eq!(http.calls_matching(QUOTE_PATH), 2);
}

#[tokio::test]
async fn when_a_symbol_cache_is_cleared_the_system_removes_only_that_symbols_entries() {
    // Given: Cached quotes for AAPL and MSFT plus AAPL history
    let h = harness(
        ScriptedHttpClient::new()
            .respond_json(QUOTE_PATH, quote_body(&[("AAPL", 189.5), ("MSFT", 410.0)]))
            .respond_json(CHART_PATH, chart_body(&rising_closes(3))),
    )
    .await;
    h.service.get_quotes(&["AAPL", "MSFT"]).await.into_result().expect("quotes");
    let start = parse_date("2024-01-02").expect("date");
    let end = parse_date("2024-01-04").expect("date");
    h.service
        .get_historical_data("AAPL", start, end, Interval::Daily)
        .await
        .into_result()
        .expect("history");

    // When: The AAPL cache is cleared
    let removed = h
        .service
        .clear_symbol_cache("aapl")
        .await
        .into_result()
        .expect("cleared");

    // Then: Both AAPL entries are gone and MSFT remains
    assert_eq!(removed, 2);
    assert!(!h.service.cache().exists("market_data:quote:AAPL").await);
    assert!(h.service.cache().exists("market_data:quote:MSFT").await);
}

#[tokio::test]
async fn when_all_caches_are_cleared_the_system_leaves_foreign_keys_alone() {
    // Given: Two cached quotes and a key owned by another application
    let h = harness(
        ScriptedHttpClient::new()
            .respond_json(QUOTE_PATH, quote_body(&[("AAPL", 189.5), ("MSFT", 410.0)])),
    )
    .await;
    h.service.get_quotes(&["AAPL", "MSFT"]).await.into_result().expect("quotes");
    h.backend
        .set("sessions:42", String::from("{}"), None)
        .await
        .expect("foreign key");

    // When: The whole market data cache is cleared
    let removed = h.service.clear_all_cache().await.into_result().expect("cleared");

    // Then: Only market data keys were removed
    assert_eq!(removed, 2);
    assert!(h.backend.exists("sessions:42").await.expect("exists"));
}

#[tokio::test]
async fn when_a_symbol_to_clear_is_malformed_the_system_rejects_it() {
    // Given: Cached data that a wildcard would match
    let h = harness(
        ScriptedHttpClient::new().respond_json(QUOTE_PATH, quote_body(&[("AAPL", 189.5)])),
    )
    .await;
    h.service.get_quote("AAPL").await.into_result().expect("quote");

    // When: The symbol is a glob
    let response = h.service.clear_symbol_cache("*").await;

    // Then: It is rejected and nothing is deleted
    assert_eq!(response.error_code(), Some(ErrorCode::InvalidSymbol));
    assert_eq!(h.backend.len().await, 1);
}

#[tokio::test]
async fn when_stats_are_requested_the_system_reports_counters_and_cache_state() {
    // Given: One provider call has been made
    let h = harness(
        ScriptedHttpClient::new().respond_json(QUOTE_PATH, quote_body(&[("AAPL", 189.5)])),
    )
    .await;
    h.service.get_quote("AAPL").await.into_result().expect("quote");

    // When: Stats are requested
    let stats = h.service.get_service_stats().await.into_result().expect("stats");

    // Then: Rate-limit counters and cache details are reported
    assert_eq!(stats.rate_limits.second, 1);
    assert_eq!(stats.rate_limits.limits.per_second, 1_000);
    assert!(stats.cache.connected);
    assert!(stats
        .cache
        .keyspace
        .as_deref()
        .is_some_and(|text| text.contains("keys=1")));
    assert!(stats.timestamp.contains('T'));
}
