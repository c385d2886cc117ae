//! ROC (Rate of Change) indicator.
//!
//! ROC(n)[i] = ((C[i] - C[i-n]) / C[i-n]) * 100
//! If C[i-n] == 0: ROC = 0
//! Warmup: first n bars invalid.

use crate::domain::indicator::{IndicatorKind, IndicatorSeries, simple_series};
use crate::domain::ohlcv::Bar;

pub fn calculate_roc(bars: &[Bar], period: usize) -> IndicatorSeries {
    let values = (0..bars.len()).map(|i| {
        if period == 0 || i < period {
            return None;
        }
        let prev_close = bars[i - period].close;
        let curr_close = bars[i].close;
        Some(if prev_close == 0.0 {
            0.0
        } else {
            ((curr_close - prev_close) / prev_close) * 100.0
        })
    });

    simple_series(IndicatorKind::Roc(period), bars, values)
}
