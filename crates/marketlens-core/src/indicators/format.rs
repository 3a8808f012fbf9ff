//! Display helpers for prices, percentages, volumes and market capitalisation.

/// Fixed two-decimal price, e.g. `"189.90"`.
pub fn format_price(price: f64) -> String {
    format_price_with(price, 2)
}

pub fn format_price_with(price: f64, decimals: usize) -> String {
    format!("{price:.decimals$}")
}

/// Signed percentage with two decimals, e.g. `"+1.25%"` or `"-0.40%"`.
pub fn format_percentage(value: f64) -> String {
    let sign = if value >= 0.0 { "+" } else { "" };
    format!("{sign}{value:.2}%")
}

/// Compact share volume: `1.2K`, `3.4M`, `5.6B`; plain integer below one thousand.
pub fn format_volume(volume: u64) -> String {
    let value = volume as f64;
    if value >= 1e9 {
        format!("{:.1}B", value / 1e9)
    } else if value >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else if value >= 1e3 {
        format!("{:.1}K", value / 1e3)
    } else {
        volume.to_string()
    }
}

/// Dollar market cap: `$2.95T`, `$812.40B`, `$45.00M`; whole dollars below one million.
pub fn format_market_cap(market_cap: f64) -> String {
    if market_cap >= 1e12 {
        format!("${:.2}T", market_cap / 1e12)
    } else if market_cap >= 1e9 {
        format!("${:.2}B", market_cap / 1e9)
    } else if market_cap >= 1e6 {
        format!("${:.2}M", market_cap / 1e6)
    } else {
        format!("${market_cap:.0}")
    }
}
