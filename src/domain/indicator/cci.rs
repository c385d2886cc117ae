//! CCI (Commodity Channel Index) indicator.
//!
//! CCI = (TP - SMA(TP, n)) / (0.015 * mean absolute deviation of TP)
//! A zero deviation yields 0.
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorKind, IndicatorSeries, simple_series};
use crate::domain::indicator_helpers::typical_prices;
use crate::domain::ohlcv::Bar;

const LAMBERT_CONSTANT: f64 = 0.015;

pub fn calculate_cci(bars: &[Bar], period: usize) -> IndicatorSeries {
    let tp = typical_prices(bars);
    let values = (0..bars.len()).map(|i| {
        if period == 0 || i + 1 < period {
            return None;
        }
        let window = &tp[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let deviation = window.iter().map(|v| (v - mean).abs()).sum::<f64>() / period as f64;
        Some(if deviation == 0.0 {
            0.0
        } else {
            (tp[i] - mean) / (LAMBERT_CONSTANT * deviation)
        })
    });

    simple_series(IndicatorKind::Cci(period), bars, values)
}
