//! OBV (On-Balance Volume) indicator.

use crate::domain::indicator::{IndicatorKind, IndicatorSeries, simple_series};
use crate::domain::ohlcv::Bar;

/// Calculate OBV (On-Balance Volume).
///
/// OBV[0] = volume[0]
/// If close[i] > close[i-1]: OBV[i] = OBV[i-1] + volume[i]
/// If close[i] < close[i-1]: OBV[i] = OBV[i-1] - volume[i]
/// If close[i] == close[i-1]: OBV[i] = OBV[i-1]
///
/// No warmup period; all bars are valid.
pub fn calculate_obv(bars: &[Bar]) -> IndicatorSeries {
    let mut obv: f64 = 0.0;
    let mut prev_close: f64 = 0.0;

    let values: Vec<Option<f64>> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                obv = bar.volume;
            } else if bar.close > prev_close {
                obv += bar.volume;
            } else if bar.close < prev_close {
                obv -= bar.volume;
            }
            prev_close = bar.close;
            Some(obv)
        })
        .collect();

    simple_series(IndicatorKind::Obv, bars, values)
}
