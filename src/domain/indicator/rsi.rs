//! RSI (Relative Strength Index) indicator.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first n bars are invalid (need n price changes).

use crate::domain::indicator::{IndicatorKind, IndicatorSeries, simple_series};
use crate::domain::ohlcv::Bar;

fn rsi_from(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

pub fn calculate_rsi(bars: &[Bar], period: usize) -> IndicatorSeries {
    let kind = IndicatorKind::Rsi(period);
    if period == 0 || bars.len() < 2 {
        return simple_series(kind, bars, bars.iter().map(|_| None));
    }

    let mut values: Vec<Option<f64>> = Vec::with_capacity(bars.len());
    values.push(None);

    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for i in 1..bars.len() {
        let change = bars[i].close - bars[i - 1].close;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        let n = i;

        if n < period {
            gain_sum += gain;
            loss_sum += loss;
            values.push(None);
        } else if n == period {
            avg_gain = (gain_sum + gain) / period as f64;
            avg_loss = (loss_sum + loss) / period as f64;
            values.push(Some(rsi_from(avg_gain, avg_loss)));
        } else {
            avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
            values.push(Some(rsi_from(avg_gain, avg_loss)));
        }
    }

    simple_series(kind, bars, values)
}
