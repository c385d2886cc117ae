//! MFI (Money Flow Index) indicator.
//!
//! Raw money flow = typical price * volume. A bar's flow is positive when its
//! typical price rose from the previous bar, negative when it fell.
//! MFI = 100 * positive / (positive + negative) over the last n bars;
//! 50 when there was no flow either way.
//! Warmup: first n bars are invalid.

use crate::domain::indicator::{IndicatorKind, IndicatorSeries, simple_series};
use crate::domain::indicator_helpers::typical_prices;
use crate::domain::ohlcv::Bar;

pub fn calculate_mfi(bars: &[Bar], period: usize) -> IndicatorSeries {
    let tp = typical_prices(bars);
    let mut positive = vec![0.0; bars.len()];
    let mut negative = vec![0.0; bars.len()];
    for i in 1..bars.len() {
        let flow = tp[i] * bars[i].volume;
        if tp[i] > tp[i - 1] {
            positive[i] = flow;
        } else if tp[i] < tp[i - 1] {
            negative[i] = flow;
        }
    }

    let values = (0..bars.len()).map(|i| {
        if period == 0 || i < period {
            return None;
        }
        let pos: f64 = positive[i + 1 - period..=i].iter().sum();
        let neg: f64 = negative[i + 1 - period..=i].iter().sum();
        let total = pos + neg;
        Some(if total == 0.0 { 50.0 } else { 100.0 * pos / total })
    });

    simple_series(IndicatorKind::Mfi(period), bars, values)
}
