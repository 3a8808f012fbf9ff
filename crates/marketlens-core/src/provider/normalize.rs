//! Mapping of heterogeneous provider payloads onto the canonical models.
//!
//! Every canonical field lists the provider keys that may carry it, in precedence order.
//! The first key holding a usable value wins; numeric fields fall back to `0` and
//! `market_cap` stays absent.

use serde_json::{Map, Value};

use crate::{Quote, SearchResult, Symbol};

type Object = Map<String, Value>;

pub(crate) const PRICE: &[&str] = &["regularMarketPrice", "price"];
pub(crate) const CHANGE: &[&str] = &["regularMarketChange", "change"];
pub(crate) const CHANGE_PERCENT: &[&str] = &["regularMarketChangePercent", "changePercent"];
pub(crate) const PREVIOUS_CLOSE: &[&str] = &["regularMarketPreviousClose", "previousClose"];
pub(crate) const OPEN: &[&str] = &["regularMarketOpen", "open"];
pub(crate) const HIGH: &[&str] = &["regularMarketDayHigh", "dayHigh"];
pub(crate) const LOW: &[&str] = &["regularMarketDayLow", "dayLow"];
pub(crate) const VOLUME: &[&str] = &["regularMarketVolume", "volume"];
pub(crate) const MARKET_CAP: &[&str] = &["marketCap"];
pub(crate) const MARKET_TIME: &[&str] = &["regularMarketTime"];

pub(crate) const SEARCH_NAME: &[&str] = &["shortname", "longname", "symbol"];
pub(crate) const SEARCH_EXCHANGE: &[&str] = &["exchDisp"];
pub(crate) const SEARCH_TYPE: &[&str] = &["typeDisp"];

const UNKNOWN_EXCHANGE: &str = "Unknown";
const DEFAULT_INSTRUMENT_TYPE: &str = "Stock";

/// Epoch values above this are taken to be milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// First numeric value among `keys`. Numeric strings count; `null` and
/// non-finite values do not.
pub(crate) fn probe_f64(object: &Object, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find_map(as_f64)
}

/// First non-blank string among `keys`.
pub(crate) fn probe_str<'a>(object: &'a Object, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .filter_map(Value::as_str)
        .find(|value| !value.trim().is_empty())
}

fn as_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Volume-like values: negative and fractional inputs are clamped and truncated.
pub(crate) fn to_volume(value: f64) -> u64 {
    if value <= 0.0 {
        0
    } else {
        value as u64
    }
}

/// Build a quote for `symbol` from one provider object. `now` is used when the payload
/// carries no market time.
pub(crate) fn quote_from_object(symbol: Symbol, object: &Object, now: i64) -> Quote {
    let field = |keys: &[&str]| probe_f64(object, keys).unwrap_or(0.0);

    Quote {
        symbol,
        price: field(PRICE),
        change: field(CHANGE),
        change_percent: field(CHANGE_PERCENT),
        previous_close: field(PREVIOUS_CLOSE),
        open: field(OPEN),
        high: field(HIGH),
        low: field(LOW),
        volume: to_volume(field(VOLUME)),
        market_cap: probe_f64(object, MARKET_CAP),
        timestamp: probe_f64(object, MARKET_TIME)
            .map(|value| epoch_seconds(value as i64))
            .unwrap_or(now),
    }
}

fn epoch_seconds(value: i64) -> i64 {
    if value > MILLIS_THRESHOLD {
        value / 1_000
    } else {
        value
    }
}

/// A quote object plus the key it was found under, for payloads keyed by symbol.
pub(crate) type QuoteEntry<'a> = (Option<&'a str>, &'a Object);

/// Locate the quote objects in a quote payload.
///
/// Accepts `{"quoteResponse": {"result": [...]}}`, a bare array, or an object keyed by
/// symbol. Returns `None` when the payload has none of these shapes.
pub(crate) fn quote_objects(payload: &Value) -> Option<Vec<QuoteEntry<'_>>> {
    if let Some(result) = payload
        .get("quoteResponse")
        .and_then(|response| response.get("result"))
    {
        return result.as_array().map(|items| unkeyed(items));
    }

    match payload {
        Value::Array(items) => Some(unkeyed(items)),
        Value::Object(map) => {
            let keyed: Vec<QuoteEntry<'_>> = map
                .iter()
                .filter_map(|(key, value)| Some((Some(key.as_str()), value.as_object()?)))
                .collect();
            (!keyed.is_empty()).then_some(keyed)
        }
        _ => None,
    }
}

fn unkeyed(items: &[Value]) -> Vec<QuoteEntry<'_>> {
    items
        .iter()
        .filter_map(Value::as_object)
        .map(|object| (None, object))
        .collect()
}

/// Pick the object describing `symbol` by its `symbol` field or its key, falling back
/// to the only entry when the payload carries exactly one unnamed object.
pub(crate) fn find_quote<'a>(entries: &[QuoteEntry<'a>], symbol: &Symbol) -> Option<&'a Object> {
    let names = |value: &str| value.trim().eq_ignore_ascii_case(symbol.as_str());

    let matched = entries.iter().find(|(key, object)| {
        object
            .get("symbol")
            .and_then(Value::as_str)
            .or(*key)
            .is_some_and(names)
    });

    if let Some((_, object)) = matched {
        return Some(*object);
    }
    match entries {
        [(None, only)] if only.get("symbol").is_none() => Some(*only),
        _ => None,
    }
}

/// Map one search hit. Items without a symbol are dropped.
pub(crate) fn search_result_from_object(object: &Object) -> Option<SearchResult> {
    let symbol = probe_str(object, &["symbol"])?.trim().to_owned();

    Some(SearchResult {
        name: probe_str(object, SEARCH_NAME)
            .unwrap_or(symbol.as_str())
            .to_owned(),
        exchange: probe_str(object, SEARCH_EXCHANGE)
            .unwrap_or(UNKNOWN_EXCHANGE)
            .to_owned(),
        instrument_type: probe_str(object, SEARCH_TYPE)
            .unwrap_or(DEFAULT_INSTRUMENT_TYPE)
            .to_owned(),
        currency: probe_str(object, &["currency"]).map(str::to_owned),
        symbol,
    })
}

/// Numeric column from a chart payload; `null` and missing entries become `0`.
pub(crate) fn column(values: Option<&Value>, len: usize) -> Vec<f64> {
    let items = values.and_then(Value::as_array);
    (0..len)
        .map(|i| {
            items
                .and_then(|items| items.get(i))
                .and_then(as_f64)
                .unwrap_or(0.0)
        })
        .collect()
}
