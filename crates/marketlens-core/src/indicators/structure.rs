use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

pub const DEFAULT_TREND_PERIOD: usize = 5;
pub const DEFAULT_LEVEL_PERIOD: usize = 20;

const TREND_THRESHOLD_PERCENT: f64 = 1.0;

/// Direction of recent price movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Flat => "flat",
        }
    }
}

impl Display for Trend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify the percent change between the first and last of the trailing `period`
/// prices: above +1% is up, below -1% is down.
pub fn trend(prices: &[f64], period: usize) -> Trend {
    if period == 0 || prices.len() < period {
        return Trend::Flat;
    }

    let recent = &prices[prices.len() - period..];
    let first = recent[0];
    let last = recent[recent.len() - 1];
    if first == 0.0 {
        return Trend::Flat;
    }

    let change_percent = (last - first) / first * 100.0;
    if change_percent > TREND_THRESHOLD_PERCENT {
        Trend::Up
    } else if change_percent < -TREND_THRESHOLD_PERCENT {
        Trend::Down
    } else {
        Trend::Flat
    }
}

/// Local extremes found by [`support_resistance`], in index order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportResistance {
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
}

/// Local-extremum detector.
///
/// Index `i` qualifies when it has `period` bars on each side: it is support when its low
/// is `<=` every low in that neighbourhood and resistance when its high is `>=` every
/// high. Adjacent equal extremes are all reported; no clustering happens.
pub fn support_resistance(highs: &[f64], lows: &[f64], period: usize) -> SupportResistance {
    let len = highs.len().min(lows.len());
    let mut levels = SupportResistance::default();
    if period == 0 || len <= period * 2 {
        return levels;
    }

    for i in period..len - period {
        let low = lows[i];
        let high = highs[i];

        let is_support = lows[i - period..i]
            .iter()
            .chain(&lows[i + 1..=i + period])
            .all(|neighbour| *neighbour >= low);
        if is_support {
            levels.support.push(low);
        }

        let is_resistance = highs[i - period..i]
            .iter()
            .chain(&highs[i + 1..=i + period])
            .all(|neighbour| *neighbour <= high);
        if is_resistance {
            levels.resistance.push(high);
        }
    }

    levels
}
