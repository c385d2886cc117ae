//! ATR (Average True Range) indicator.
//!
//! Wilder-smoothed true range. The seed at index n-1 is the mean of the first
//! n true ranges (the first bar's range is high - low).
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorKind, IndicatorSeries, simple_series};
use crate::domain::indicator_helpers::{true_ranges, wilder_average};
use crate::domain::ohlcv::Bar;

pub fn calculate_atr(bars: &[Bar], period: usize) -> IndicatorSeries {
    let tr = true_ranges(bars);
    simple_series(IndicatorKind::Atr(period), bars, wilder_average(&tr, period, 0))
}
