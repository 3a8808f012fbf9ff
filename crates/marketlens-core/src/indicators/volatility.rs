use serde::{Deserialize, Serialize};

use super::moving_average::sma;

pub const DEFAULT_BOLLINGER_PERIOD: usize = 20;
pub const DEFAULT_BOLLINGER_STD_DEV: f64 = 2.0;
pub const DEFAULT_VOLATILITY_PERIOD: usize = 20;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Bollinger bands; all three series share the SMA's length and alignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Middle band is `SMA(period)`; the outer bands sit `std_devs` population standard
/// deviations (divisor `period`) away from it, measured over the same window.
pub fn bollinger_bands(prices: &[f64], period: usize, std_devs: f64) -> BollingerBands {
    let middle = sma(prices, period);
    if middle.is_empty() {
        return BollingerBands::default();
    }

    let (upper, lower) = prices
        .windows(period)
        .zip(&middle)
        .map(|(window, &mean)| {
            let width = std_devs.abs() * population_std_dev(window, mean);
            (mean + width, mean - width)
        })
        .unzip();

    BollingerBands {
        upper,
        middle,
        lower,
    }
}

/// Annualized rolling volatility of log returns.
///
/// Each output is the population standard deviation of `period` consecutive log
/// returns scaled by `sqrt(252)`; output length is `prices.len() - period`.
pub fn volatility(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || prices.len() <= period {
        return Vec::new();
    }

    let returns: Vec<f64> = prices
        .windows(2)
        .map(|pair| (pair[1] / pair[0]).ln())
        .collect();

    let annualize = TRADING_DAYS_PER_YEAR.sqrt();
    returns
        .windows(period)
        .map(|window| {
            let mean = window.iter().sum::<f64>() / period as f64;
            population_std_dev(window, mean) * annualize
        })
        .collect()
}

fn population_std_dev(window: &[f64], mean: f64) -> f64 {
    let variance = window
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / window.len() as f64;
    variance.sqrt()
}
