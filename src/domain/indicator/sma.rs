//! Simple Moving Average indicator.
//!
//! SMA(n)[i] = (C[i-n+1] + ... + C[i]) / n, kept as a running window sum.
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorKind, IndicatorSeries, simple_series};
use crate::domain::ohlcv::Bar;

pub fn calculate_sma(bars: &[Bar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return simple_series(IndicatorKind::Sma(period), bars, bars.iter().map(|_| None));
    }

    let mut window_sum = 0.0;
    let values: Vec<Option<f64>> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            window_sum += bar.close;
            if i >= period {
                window_sum -= bars[i - period].close;
            }
            (i + 1 >= period).then(|| window_sum / period as f64)
        })
        .collect();

    simple_series(IndicatorKind::Sma(period), bars, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::{make_bars, simple};

    #[test]
    fn sma_warmup() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0]);
        let series = calculate_sma(&bars, 3);
        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[3].valid);
    }

    #[test]
    fn sma_sliding_window() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 10.0]);
        let series = calculate_sma(&bars, 3);
        assert!((simple(&series, 2) - 2.0).abs() < f64::EPSILON);
        assert!((simple(&series, 3) - 3.0).abs() < f64::EPSILON);
        assert!((simple(&series, 4) - 17.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn sma_period_1_is_close() {
        let bars = make_bars(&[5.0, 7.0]);
        let series = calculate_sma(&bars, 1);
        assert!((simple(&series, 0) - 5.0).abs() < f64::EPSILON);
        assert!((simple(&series, 1) - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sma_shorter_than_period() {
        let bars = make_bars(&[1.0, 2.0]);
        let series = calculate_sma(&bars, 5);
        assert_eq!(series.values.len(), 2);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn sma_period_0() {
        let bars = make_bars(&[1.0, 2.0]);
        let series = calculate_sma(&bars, 0);
        assert!(series.values.iter().all(|p| !p.valid));
        assert_eq!(series.kind, IndicatorKind::Sma(0));
    }
}
