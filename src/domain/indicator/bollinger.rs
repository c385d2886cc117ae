//! Bollinger Bands indicator.
//!
//! - Middle: Simple Moving Average over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the population standard deviation (divides by N, not N-1).
//! Warmup: first (period-1) bars are invalid.

use crate::domain::indicator::stddev::mean_and_stddev;
use crate::domain::indicator::{IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorValue};
use crate::domain::ohlcv::Bar;

pub fn calculate_bollinger(bars: &[Bar], period: usize, stddev_mult_x100: u32) -> IndicatorSeries {
    let mult = stddev_mult_x100 as f64 / 100.0;
    let mut values = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        if period == 0 || i + 1 < period {
            values.push(IndicatorPoint {
                timestamp: bar.timestamp,
                valid: false,
                value: IndicatorValue::Bollinger {
                    upper: 0.0,
                    middle: 0.0,
                    lower: 0.0,
                },
            });
            continue;
        }

        let window = bars[i + 1 - period..=i].iter().map(|b| b.close);
        let (middle, stddev) = mean_and_stddev(window);
        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid: true,
            value: IndicatorValue::Bollinger {
                upper: middle + mult * stddev,
                middle,
                lower: middle - mult * stddev,
            },
        });
    }

    IndicatorSeries {
        kind: IndicatorKind::Bollinger {
            period,
            stddev_mult_x100,
        },
        values,
    }
}
