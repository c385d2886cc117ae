//! Shared helper functions for indicator calculations.

use crate::domain::ohlcv::Bar;

/// True range per bar. The first bar has no previous close, so its range is
/// high - low.
pub fn true_ranges(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect()
}

/// Wilder smoothing of `values` starting at index `start`.
///
/// The first output (at `start + period - 1`) is the plain mean of
/// `values[start..start + period]`; each later output is
/// `(prev * (period - 1) + value) / period`. Earlier slots are `None`.
pub fn wilder_average(values: &[f64], period: usize, start: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    let seed_end = match start.checked_add(period) {
        Some(end) if period > 0 && end <= values.len() => end - 1,
        _ => return out,
    };

    let mut avg = values[start..=seed_end].iter().sum::<f64>() / period as f64;
    out[seed_end] = Some(avg);
    for i in (seed_end + 1)..values.len() {
        avg = (avg * (period - 1) as f64 + values[i]) / period as f64;
        out[i] = Some(avg);
    }
    out
}

/// Typical price per bar.
pub fn typical_prices(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(Bar::typical_price).collect()
}
