//! ADX (Average Directional Index) indicator, Wilder's method.
//!
//! +DM = high[i] - high[i-1] when it exceeds low[i-1] - low[i] and is positive,
//! -DM symmetrically. TR, +DM and -DM are Wilder-smoothed over n from bar 1,
//! giving +DI / -DI at bar n. DX = 100 * |+DI - -DI| / (+DI + -DI) and ADX is
//! the Wilder average of DX.
//! Warmup: first (2n-1) bars are invalid.

use crate::domain::indicator::{IndicatorKind, IndicatorSeries, simple_series};
use crate::domain::indicator_helpers::{true_ranges, wilder_average};
use crate::domain::ohlcv::Bar;

pub fn calculate_adx(bars: &[Bar], period: usize) -> IndicatorSeries {
    let kind = IndicatorKind::Adx(period);
    if period == 0 || bars.len() < 2 {
        return simple_series(kind, bars, bars.iter().map(|_| None));
    }

    let tr = true_ranges(bars);
    let mut plus_dm = vec![0.0; bars.len()];
    let mut minus_dm = vec![0.0; bars.len()];
    for i in 1..bars.len() {
        let up = bars[i].high - bars[i - 1].high;
        let down = bars[i - 1].low - bars[i].low;
        if up > down && up > 0.0 {
            plus_dm[i] = up;
        }
        if down > up && down > 0.0 {
            minus_dm[i] = down;
        }
    }

    // Wilder averages and Wilder running sums differ only by a factor of n,
    // which cancels in the DI ratios.
    let smooth_tr = wilder_average(&tr, period, 1);
    let smooth_plus = wilder_average(&plus_dm, period, 1);
    let smooth_minus = wilder_average(&minus_dm, period, 1);

    let dx: Vec<f64> = (0..bars.len())
        .map(|i| match (smooth_tr[i], smooth_plus[i], smooth_minus[i]) {
            (Some(atr), Some(p), Some(m)) if atr > 0.0 => {
                let plus_di = 100.0 * p / atr;
                let minus_di = 100.0 * m / atr;
                let sum = plus_di + minus_di;
                if sum > 0.0 {
                    100.0 * (plus_di - minus_di).abs() / sum
                } else {
                    0.0
                }
            }
            (Some(_), Some(_), Some(_)) => 0.0,
            _ => f64::NAN,
        })
        .collect();

    simple_series(kind, bars, wilder_average(&dx, period, period))
}
