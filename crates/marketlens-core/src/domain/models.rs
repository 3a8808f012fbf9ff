use serde::{Deserialize, Serialize};

use crate::Symbol;

/// Canonical quote snapshot.
///
/// `change` is expected to equal `price - previous_close` but the provider's values are
/// passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: Symbol,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub previous_close: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub volume: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    /// Epoch seconds.
    pub timestamp: i64,
}

/// One price bar. `time` is a `YYYY-MM-DD` calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ohlcv {
    pub time: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Bars for one symbol in ascending chronological order, exactly as the provider's
/// trading calendar returned them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalData {
    pub symbol: Symbol,
    pub data: Vec<Ohlcv>,
}

impl HistoricalData {
    pub fn new(symbol: Symbol, data: Vec<Ohlcv>) -> Self {
        Self { symbol, data }
    }

    pub fn closes(&self) -> Vec<f64> {
        self.data.iter().map(|bar| bar.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.data.iter().map(|bar| bar.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.data.iter().map(|bar| bar.low).collect()
    }

    pub fn dates(&self) -> Vec<String> {
        self.data.iter().map(|bar| bar.time.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Symbol search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub symbol: String,
    pub name: String,
    pub exchange: String,
    #[serde(rename = "type")]
    pub instrument_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// Computed indicator series. `values` and `timestamps` always have equal length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalIndicator {
    pub name: String,
    pub values: Vec<f64>,
    pub timestamps: Vec<String>,
}

impl TechnicalIndicator {
    /// Pair `values` with the trailing dates of the source series.
    pub fn aligned(name: impl Into<String>, values: Vec<f64>, dates: &[String]) -> Self {
        let count = values.len().min(dates.len());
        let values = values[values.len() - count..].to_vec();
        let timestamps = dates[dates.len() - count..].to_vec();

        Self {
            name: name.into(),
            values,
            timestamps,
        }
    }
}
