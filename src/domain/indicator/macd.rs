//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line, seeded with the SMA of its first
//! `signal` valid values
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: slow - 1 + signal - 1 bars.

use crate::domain::indicator::{
    IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorValue, calculate_ema,
};
use crate::domain::ohlcv::Bar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    bars: &[Bar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let kind = IndicatorKind::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    let warmup_value = |bar: &Bar| IndicatorPoint {
        timestamp: bar.timestamp,
        valid: false,
        value: IndicatorValue::Macd {
            line: 0.0,
            signal: 0.0,
            histogram: 0.0,
        },
    };

    if fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries {
            kind,
            values: bars.iter().map(warmup_value).collect(),
        };
    }

    let ema_fast = ema_raw_values(bars, fast);
    let ema_slow = ema_raw_values(bars, slow);
    let macd_line: Vec<f64> = ema_fast.iter().zip(&ema_slow).map(|(f, s)| f - s).collect();

    let k = 2.0 / (signal_period as f64 + 1.0);
    let mut signal_line: Vec<f64> = vec![0.0; bars.len()];
    let line_warmup = fast.max(slow) - 1;
    let signal_warmup = line_warmup.saturating_add(signal_period - 1);

    if signal_warmup < bars.len() {
        let seed: f64 = macd_line[line_warmup..=signal_warmup].iter().sum::<f64>()
            / signal_period as f64;
        let mut signal_ema = seed;
        signal_line[signal_warmup] = signal_ema;
        for i in (signal_warmup + 1)..bars.len() {
            signal_ema = macd_line[i] * k + signal_ema * (1.0 - k);
            signal_line[i] = signal_ema;
        }
    }

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i < signal_warmup {
                return warmup_value(bar);
            }
            let line = macd_line[i];
            let signal = signal_line[i];
            IndicatorPoint {
                timestamp: bar.timestamp,
                valid: true,
                value: IndicatorValue::Macd {
                    line,
                    signal,
                    histogram: line - signal,
                },
            }
        })
        .collect();

    IndicatorSeries { kind, values }
}

/// Raw EMA values, 0.0 for warmup bars.
fn ema_raw_values(bars: &[Bar], period: usize) -> Vec<f64> {
    calculate_ema(bars, period)
        .values
        .iter()
        .map(|p| match p.value {
            IndicatorValue::Simple(v) if p.valid => v,
            _ => 0.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;

    fn rising(n: usize) -> Vec<Bar> {
        let prices: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        make_bars(&prices)
    }

    #[test]
    fn macd_warmup_default() {
        let bars = rising(40);
        let series = calculate_macd(&bars, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL);

        let warmup = DEFAULT_SLOW - 1 + DEFAULT_SIGNAL - 1;
        for i in 0..warmup {
            assert!(!series.values[i].valid, "Index {} should not be valid", i);
        }
        assert!(series.values[warmup].valid);
    }

    #[test]
    fn macd_histogram_equals_line_minus_signal() {
        let bars = rising(40);
        let series = calculate_macd(&bars, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL);

        for point in series.values.iter().filter(|p| p.valid) {
            if let IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } = point.value
            {
                assert!((histogram - (line - signal)).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn macd_positive_in_uptrend() {
        let bars = rising(40);
        let series = calculate_macd(&bars, 3, 6, 3);
        if let IndicatorValue::Macd { line, .. } = series.values[39].value {
            assert!(line > 0.0);
        } else {
            panic!("expected MACD value");
        }
    }

    #[test]
    fn macd_short_input_all_invalid() {
        let bars = rising(10);
        let series = calculate_macd(&bars, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL);
        assert_eq!(series.values.len(), 10);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn macd_huge_periods_all_invalid() {
        let bars = rising(5);
        let series = calculate_macd(&bars, 2, usize::MAX, usize::MAX);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn macd_zero_period_all_invalid() {
        let bars = rising(5);
        let series = calculate_macd(&bars, 0, 3, 2);
        assert!(series.values.iter().all(|p| !p.valid));
    }
}
