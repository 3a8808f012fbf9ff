use serde::{Deserialize, Serialize};

use super::moving_average::{ema, sma};

pub const DEFAULT_RSI_PERIOD: usize = 14;
pub const DEFAULT_MACD_FAST: usize = 12;
pub const DEFAULT_MACD_SLOW: usize = 26;
pub const DEFAULT_MACD_SIGNAL: usize = 9;
pub const DEFAULT_STOCHASTIC_K: usize = 14;
pub const DEFAULT_STOCHASTIC_D: usize = 3;

/// Wilder's relative strength index.
///
/// Needs `period + 1` prices; output length is `prices.len() - period`. Values are in
/// `[0, 100]`, with 100 whenever the average loss is zero.
pub fn rsi(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || prices.len() <= period {
        return Vec::new();
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = prices
        .windows(2)
        .map(|pair| {
            let change = pair[1] - pair[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    let divisor = period as f64;
    let mut avg_gain = gains[..period].iter().sum::<f64>() / divisor;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / divisor;

    let mut output = Vec::with_capacity(gains.len() - period + 1);
    output.push(relative_strength(avg_gain, avg_loss));

    for (gain, loss) in gains[period..].iter().zip(&losses[period..]) {
        avg_gain = (avg_gain * (divisor - 1.0) + gain) / divisor;
        avg_loss = (avg_loss * (divisor - 1.0) + loss) / divisor;
        output.push(relative_strength(avg_gain, avg_loss));
    }

    output
}

fn relative_strength(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

/// MACD line, signal line and histogram.
///
/// `macd` is aligned to the slow EMA, `signal` and `histogram` to the signal EMA, so
/// every series ends on the last input price.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Macd {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Empty unless `0 < fast < slow` and there is at least `slow` prices.
pub fn macd(prices: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    if fast == 0 || fast >= slow {
        return Macd::default();
    }

    let fast_ema = ema(prices, fast);
    let slow_ema = ema(prices, slow);
    if fast_ema.is_empty() || slow_ema.is_empty() {
        return Macd::default();
    }

    let offset = slow - fast;
    let macd_line: Vec<f64> = slow_ema
        .iter()
        .zip(&fast_ema[offset..])
        .map(|(slow_value, fast_value)| fast_value - slow_value)
        .collect();

    let signal_line = ema(&macd_line, signal);
    let signal_offset = macd_line.len() - signal_line.len();
    let histogram = macd_line[signal_offset..]
        .iter()
        .zip(&signal_line)
        .map(|(line, signal)| line - signal)
        .collect();

    Macd {
        macd: macd_line,
        signal: signal_line,
        histogram,
    }
}

/// Stochastic oscillator `%K` and its `%D` smoothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stochastic {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

/// `%K` is 50 whenever the window's highest high equals its lowest low.
///
/// Series of unequal length are truncated to the shortest one.
pub fn stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    k_period: usize,
    d_period: usize,
) -> Stochastic {
    let len = highs.len().min(lows.len()).min(closes.len());
    if k_period == 0 || len < k_period {
        return Stochastic::default();
    }

    let k: Vec<f64> = (k_period - 1..len)
        .map(|i| {
            let start = i + 1 - k_period;
            let highest = highs[start..=i]
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max);
            let lowest = lows[start..=i].iter().copied().fold(f64::INFINITY, f64::min);

            if highest == lowest {
                50.0
            } else {
                (closes[i] - lowest) / (highest - lowest) * 100.0
            }
        })
        .collect();

    let d = sma(&k, d_period);
    Stochastic { k, d }
}
