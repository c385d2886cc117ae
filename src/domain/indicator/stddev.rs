//! Standard Deviation indicator.
//!
//! Population standard deviation over n closing prices.
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n-1) / n)
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorKind, IndicatorSeries, simple_series};
use crate::domain::ohlcv::Bar;

/// Mean and population standard deviation of the window.
pub(crate) fn mean_and_stddev(window: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let n = window.clone().count() as f64;
    let mean = window.clone().sum::<f64>() / n;
    let variance = window
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    (mean, variance.sqrt())
}

pub fn calculate_stddev(bars: &[Bar], period: usize) -> IndicatorSeries {
    let values = (0..bars.len()).map(|i| {
        if period == 0 || i + 1 < period {
            return None;
        }
        let window = bars[i + 1 - period..=i].iter().map(|b| b.close);
        Some(mean_and_stddev(window).1)
    });

    simple_series(IndicatorKind::Stddev(period), bars, values)
}
