//! OHLCV bar representation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::error::BacktestError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    fn first_non_finite_field(&self) -> Option<&'static str> {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(name, _)| name)
    }
}

/// Check that a symbol's bar sequence can be simulated: non-empty, every bar
/// tagged with `symbol`, every field finite, timestamps strictly increasing.
pub fn validate_series(symbol: &str, bars: &[Bar]) -> Result<(), BacktestError> {
    if bars.is_empty() {
        return Err(BacktestError::NoData {
            symbol: symbol.to_string(),
        });
    }
    for (index, bar) in bars.iter().enumerate() {
        if bar.symbol != symbol {
            return Err(BacktestError::SymbolMismatch {
                expected: symbol.to_string(),
                found: bar.symbol.clone(),
                index,
            });
        }
        if let Some(field) = bar.first_non_finite_field() {
            return Err(BacktestError::InvalidBar {
                symbol: symbol.to_string(),
                index,
                field,
            });
        }
        if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
            return Err(BacktestError::NonMonotonicTimestamp {
                symbol: symbol.to_string(),
                index,
                timestamp: bar.timestamp.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn sample_bar() -> Bar {
        Bar {
            symbol: "AAPL".into(),
            timestamp: ts(15),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 50_000.0,
        }
    }

    fn series(days: &[u32]) -> Vec<Bar> {
        days.iter()
            .map(|&d| Bar {
                timestamp: ts(d),
                ..sample_bar()
            })
            .collect()
    }

    #[test]
    fn typical_price() {
        let bar = sample_bar();
        let expected = (110.0 + 90.0 + 105.0) / 3.0;
        assert!((bar.typical_price() - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_hl_dominates() {
        let bar = sample_bar();
        assert!((bar.true_range(100.0) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bar = sample_bar();
        // |110-70| = 40 beats high-low = 20
        assert!((bar.true_range(70.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_down() {
        let bar = sample_bar();
        assert!((bar.true_range(130.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn valid_series_passes() {
        assert!(validate_series("AAPL", &series(&[2, 3, 4])).is_ok());
    }

    #[test]
    fn empty_series_is_no_data() {
        let err = validate_series("AAPL", &[]).unwrap_err();
        assert!(matches!(err, BacktestError::NoData { .. }));
    }

    #[test]
    fn repeated_timestamp_rejected() {
        let err = validate_series("AAPL", &series(&[2, 3, 3])).unwrap_err();
        match err {
            BacktestError::NonMonotonicTimestamp { symbol, index, .. } => {
                assert_eq!(symbol, "AAPL");
                assert_eq!(index, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn nan_field_rejected() {
        let mut bars = series(&[2, 3]);
        bars[1].close = f64::NAN;
        let err = validate_series("AAPL", &bars).unwrap_err();
        assert!(matches!(
            err,
            BacktestError::InvalidBar {
                index: 1,
                field: "close",
                ..
            }
        ));
    }

    #[test]
    fn foreign_symbol_rejected() {
        let mut bars = series(&[2, 3]);
        bars[0].symbol = "MSFT".into();
        let err = validate_series("AAPL", &bars).unwrap_err();
        assert!(matches!(err, BacktestError::SymbolMismatch { index: 0, .. }));
    }
}
