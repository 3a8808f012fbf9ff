/// Simple moving average over a sliding window.
///
/// Output length is `data.len() - period + 1`; element `i` is the mean of
/// `data[i..i + period]`. Empty when `period` is zero or exceeds the input.
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return Vec::new();
    }

    let divisor = period as f64;
    data.windows(period)
        .map(|window| window.iter().sum::<f64>() / divisor)
        .collect()
}

/// Exponential moving average seeded with the SMA of the first `period` values.
///
/// Uses `alpha = 2 / (period + 1)`. Output length matches [`sma`].
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return Vec::new();
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let seed = data[..period].iter().sum::<f64>() / period as f64;

    let mut output = Vec::with_capacity(data.len() - period + 1);
    output.push(seed);

    let mut previous = seed;
    for &value in &data[period..] {
        previous = (value - previous) * alpha + previous;
        output.push(previous);
    }

    output
}
