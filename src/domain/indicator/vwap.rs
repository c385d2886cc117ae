//! Rolling VWAP (Volume-Weighted Average Price) indicator.
//!
//! VWAP(n)[i] = sum(TP * volume) / sum(volume) over the last n bars.
//! Windows with zero total volume stay invalid.
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorKind, IndicatorSeries, simple_series};
use crate::domain::ohlcv::Bar;

pub fn calculate_vwap(bars: &[Bar], period: usize) -> IndicatorSeries {
    let values = (0..bars.len()).map(|i| {
        if period == 0 || i + 1 < period {
            return None;
        }
        let window = &bars[i + 1 - period..=i];
        let volume: f64 = window.iter().map(|b| b.volume).sum();
        let notional: f64 = window.iter().map(|b| b.typical_price() * b.volume).sum();
        (volume > 0.0).then(|| notional / volume)
    });

    simple_series(IndicatorKind::Vwap(period), bars, values)
}
