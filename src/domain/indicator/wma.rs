//! Weighted Moving Average indicator.
//!
//! O(n) sliding window: the weighted sum drops the whole window sum and adds
//! n times the newest close on every step.
//! WMA(n) = (1*P[i-n+1] + 2*P[i-n+2] + ... + n*P[i]) / (n*(n+1)/2)
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorKind, IndicatorSeries, simple_series};
use crate::domain::ohlcv::Bar;

pub fn calculate_wma(bars: &[Bar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return simple_series(IndicatorKind::Wma(period), bars, bars.iter().map(|_| None));
    }

    let divisor = (period * (period + 1)) as f64 / 2.0;
    let mut weighted_sum: f64 = 0.0;
    let mut window_sum: f64 = 0.0;
    let mut values = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        if i < period {
            weighted_sum += (i + 1) as f64 * bar.close;
            window_sum += bar.close;
        } else {
            weighted_sum += period as f64 * bar.close - window_sum;
            window_sum += bar.close - bars[i - period].close;
        }
        values.push((i + 1 >= period).then(|| weighted_sum / divisor));
    }

    simple_series(IndicatorKind::Wma(period), bars, values)
}
