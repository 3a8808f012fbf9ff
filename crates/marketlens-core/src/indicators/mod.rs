//! # Indicator Engine
//!
//! Pure numeric functions over ordered price series. Nothing here performs I/O or keeps
//! state, so every function can run on any thread.
//!
//! | Function | Output length |
//! |----------|---------------|
//! | [`sma`], [`ema`] | `n - period + 1` |
//! | [`rsi`] | `n - period` |
//! | [`macd`] | MACD `n - slow + 1`, signal/histogram `n - slow - signal + 2` |
//! | [`bollinger_bands`] | `n - period + 1` |
//! | [`stochastic`] | `%K` `n - k + 1`, `%D` `n - k - d + 2` |
//! | [`volatility`] | `n - period` |
//!
//! Inputs too short for the requested period produce empty output rather than an error.

mod format;
mod momentum;
mod moving_average;
mod structure;
mod volatility;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

pub use format::{format_market_cap, format_percentage, format_price, format_price_with, format_volume};
pub use momentum::{
    macd, rsi, stochastic, Macd, Stochastic, DEFAULT_MACD_FAST, DEFAULT_MACD_SIGNAL,
    DEFAULT_MACD_SLOW, DEFAULT_RSI_PERIOD, DEFAULT_STOCHASTIC_D, DEFAULT_STOCHASTIC_K,
};
pub use moving_average::{ema, sma};
pub use structure::{
    support_resistance, trend, SupportResistance, Trend, DEFAULT_LEVEL_PERIOD,
    DEFAULT_TREND_PERIOD,
};
pub use volatility::{
    bollinger_bands, volatility, BollingerBands, DEFAULT_BOLLINGER_PERIOD,
    DEFAULT_BOLLINGER_STD_DEV, DEFAULT_VOLATILITY_PERIOD,
};

/// Indicators the service can compute from a historical series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    Sma,
    Ema,
    Rsi,
    Macd,
    Bollinger,
    Stochastic,
}

impl IndicatorKind {
    pub const ALL: [Self; 6] = [
        Self::Sma,
        Self::Ema,
        Self::Rsi,
        Self::Macd,
        Self::Bollinger,
        Self::Stochastic,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sma => "sma",
            Self::Ema => "ema",
            Self::Rsi => "rsi",
            Self::Macd => "macd",
            Self::Bollinger => "bollinger",
            Self::Stochastic => "stochastic",
        }
    }
}

impl Display for IndicatorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndicatorKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ValidationError::UnknownIndicator {
                value: value.to_owned(),
            })
    }
}

/// Optional overrides for multi-parameter indicators. Unset fields use the
/// conventional defaults (MACD 12/26/9, Bollinger 2σ, %D 3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub fast: Option<usize>,
    pub slow: Option<usize>,
    pub signal: Option<usize>,
    pub std_dev: Option<f64>,
    pub d_period: Option<usize>,
}

impl IndicatorParams {
    pub fn macd_periods(&self) -> (usize, usize, usize) {
        (
            self.fast.unwrap_or(DEFAULT_MACD_FAST),
            self.slow.unwrap_or(DEFAULT_MACD_SLOW),
            self.signal.unwrap_or(DEFAULT_MACD_SIGNAL),
        )
    }

    pub fn bollinger_std_dev(&self) -> f64 {
        self.std_dev.unwrap_or(DEFAULT_BOLLINGER_STD_DEV)
    }

    pub fn stochastic_d_period(&self) -> usize {
        self.d_period.unwrap_or(DEFAULT_STOCHASTIC_D)
    }
}
