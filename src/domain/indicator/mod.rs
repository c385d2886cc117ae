//! Technical indicator implementations.
//!
//! - `IndicatorSpec`: an indicator as declared by a strategy (name + parameters)
//! - `IndicatorKind`: resolved identity + parameters, also the calculation dispatch
//! - `IndicatorPoint` / `IndicatorValue`: one point of an indicator series
//! - `IndicatorSeries`: a time series of indicator values aligned with its bars
//!
//! Every calculation returns exactly one point per input bar. Points inside the
//! warm-up window are flagged invalid and surface as NaN once flattened into
//! columns.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod cci;
pub mod ema;
pub mod macd;
pub mod mfi;
pub mod obv;
pub mod roc;
pub mod rsi;
pub mod sma;
pub mod stddev;
pub mod vwap;
pub mod wma;

pub use adx::calculate_adx;
pub use atr::calculate_atr;
pub use bollinger::calculate_bollinger;
pub use cci::calculate_cci;
pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use mfi::calculate_mfi;
pub use obv::calculate_obv;
pub use roc::calculate_roc;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
pub use stddev::calculate_stddev;
pub use vwap::calculate_vwap;
pub use wma::calculate_wma;

use chrono::NaiveDateTime;
use std::fmt;

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub valid: bool,
    pub value: IndicatorValue,
}

impl IndicatorPoint {
    pub fn simple(timestamp: NaiveDateTime, value: f64) -> Self {
        Self {
            timestamp,
            valid: true,
            value: IndicatorValue::Simple(value),
        }
    }

    pub fn warmup(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            valid: false,
            value: IndicatorValue::Simple(0.0),
        }
    }
}

#[derive(Debug, Clone)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

impl IndicatorValue {
    fn outputs(&self) -> Vec<f64> {
        match *self {
            IndicatorValue::Simple(v) => vec![v],
            IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } => vec![line, signal, histogram],
            IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            } => vec![upper, middle, lower],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    Sma(usize),
    Ema(usize),
    Wma(usize),
    Rsi(usize),
    Roc(usize),
    Atr(usize),
    Stddev(usize),
    Adx(usize),
    Cci(usize),
    Mfi(usize),
    Vwap(usize),
    Obv,
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

/// A column produced by an indicator. `alias` is the short key a strategy may
/// use instead of `name`; it is only registered when no other declared
/// indicator claims it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputColumn {
    pub name: String,
    pub alias: Option<String>,
}

impl OutputColumn {
    fn new(name: impl Into<String>, alias: Option<&str>) -> Self {
        Self {
            name: name.into(),
            alias: alias.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub kind: IndicatorKind,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Flatten into one vector per output column, NaN wherever the point is
    /// still warming up.
    pub fn column_values(&self) -> Vec<Vec<f64>> {
        let width = self.kind.columns().len();
        let mut columns = vec![Vec::with_capacity(self.values.len()); width];
        for point in &self.values {
            let outputs = point.value.outputs();
            for (col, column) in columns.iter_mut().enumerate() {
                let v = match outputs.get(col) {
                    Some(&v) if point.valid && v.is_finite() => v,
                    _ => f64::NAN,
                };
                column.push(v);
            }
        }
        columns
    }
}

/// An indicator as declared in a strategy: a name plus named numeric parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSpec {
    pub name: String,
    pub params: Vec<(String, f64)>,
}

impl IndicatorSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: f64) -> Self {
        self.params.push((key.into(), value));
        self
    }
}

impl fmt::Display for IndicatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self
                .params
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            write!(f, "({})", params.join(", "))?;
        }
        Ok(())
    }
}

struct ParamReader<'a> {
    indicator: &'a str,
    params: &'a [(String, f64)],
}

impl ParamReader<'_> {
    fn check_known(&self, known: &[&str]) -> Result<(), BacktestError> {
        for (key, _) in self.params {
            let key = key.to_ascii_lowercase();
            if !known.contains(&key.as_str()) {
                return Err(self.invalid(&key, "unknown parameter"));
            }
        }
        Ok(())
    }

    fn raw(&self, key: &str) -> Option<f64> {
        self.params
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| *v)
    }

    fn period(&self, key: &str, default: usize) -> Result<usize, BacktestError> {
        match self.raw(key) {
            None => Ok(default),
            Some(v) if v.is_finite() && v >= 1.0 && v.fract() == 0.0 => {
                if v > MAX_PERIOD as f64 {
                    return Err(self.invalid(key, &format!("must be at most {MAX_PERIOD}, got {v}")));
                }
                Ok(v as usize)
            }
            Some(v) => Err(self.invalid(key, &format!("must be a positive integer, got {v}"))),
        }
    }

    fn positive(&self, key: &str, default: f64) -> Result<f64, BacktestError> {
        match self.raw(key) {
            None => Ok(default),
            Some(v) if v.is_finite() && v > 0.0 => Ok(v),
            Some(v) => Err(self.invalid(key, &format!("must be positive, got {v}"))),
        }
    }

    fn invalid(&self, param: &str, reason: &str) -> BacktestError {
        BacktestError::InvalidIndicatorParam {
            indicator: self.indicator.to_string(),
            param: param.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Upper bound on any window length.
pub const MAX_PERIOD: usize = 1_000_000;

pub const DEFAULT_MA_PERIOD: usize = 20;
pub const DEFAULT_RSI_PERIOD: usize = 14;
pub const DEFAULT_ROC_PERIOD: usize = 10;
pub const DEFAULT_ATR_PERIOD: usize = 14;
pub const DEFAULT_ADX_PERIOD: usize = 14;
pub const DEFAULT_CCI_PERIOD: usize = 20;
pub const DEFAULT_MFI_PERIOD: usize = 14;
pub const DEFAULT_VWAP_PERIOD: usize = 5;
pub const DEFAULT_BBANDS_STD_DEV: f64 = 2.0;

impl IndicatorKind {
    /// Resolve a declared indicator. Unknown names and malformed parameters
    /// are configuration errors.
    pub fn from_spec(spec: &IndicatorSpec) -> Result<Self, BacktestError> {
        let name = spec.name.trim().to_ascii_lowercase();
        let reader = ParamReader {
            indicator: &name,
            params: &spec.params,
        };

        let windowed = |default: usize| -> Result<usize, BacktestError> {
            reader.check_known(&["period"])?;
            reader.period("period", default)
        };

        let kind = match name.as_str() {
            "sma" => IndicatorKind::Sma(windowed(DEFAULT_MA_PERIOD)?),
            "ema" => IndicatorKind::Ema(windowed(DEFAULT_MA_PERIOD)?),
            "wma" => IndicatorKind::Wma(windowed(DEFAULT_MA_PERIOD)?),
            "rsi" => IndicatorKind::Rsi(windowed(DEFAULT_RSI_PERIOD)?),
            "roc" => IndicatorKind::Roc(windowed(DEFAULT_ROC_PERIOD)?),
            "atr" => IndicatorKind::Atr(windowed(DEFAULT_ATR_PERIOD)?),
            "stddev" => IndicatorKind::Stddev(windowed(DEFAULT_MA_PERIOD)?),
            "adx" => IndicatorKind::Adx(windowed(DEFAULT_ADX_PERIOD)?),
            "cci" => IndicatorKind::Cci(windowed(DEFAULT_CCI_PERIOD)?),
            "mfi" => IndicatorKind::Mfi(windowed(DEFAULT_MFI_PERIOD)?),
            "vwap" => IndicatorKind::Vwap(windowed(DEFAULT_VWAP_PERIOD)?),
            "obv" => {
                reader.check_known(&[])?;
                IndicatorKind::Obv
            }
            "macd" => {
                reader.check_known(&["fast", "slow", "signal"])?;
                let fast = reader.period("fast", macd::DEFAULT_FAST)?;
                let slow = reader.period("slow", macd::DEFAULT_SLOW)?;
                let signal = reader.period("signal", macd::DEFAULT_SIGNAL)?;
                if fast >= slow {
                    return Err(reader.invalid("fast", "must be shorter than slow"));
                }
                IndicatorKind::Macd { fast, slow, signal }
            }
            "bbands" | "bollinger" | "bollinger_bands" => {
                reader.check_known(&["period", "std_dev"])?;
                let period = reader.period("period", DEFAULT_MA_PERIOD)?;
                let mult = reader.positive("std_dev", DEFAULT_BBANDS_STD_DEV)?;
                let scaled = (mult * 100.0).round();
                if scaled < 1.0 || scaled > u32::MAX as f64 {
                    return Err(reader.invalid(
                        "std_dev",
                        &format!("must be between 0.01 and {}, got {mult}", u32::MAX / 100),
                    ));
                }
                IndicatorKind::Bollinger {
                    period,
                    stddev_mult_x100: scaled as u32,
                }
            }
            _ => return Err(BacktestError::UnknownIndicator { name }),
        };
        Ok(kind)
    }

    /// Output columns in the order produced by [`IndicatorSeries::column_values`].
    pub fn columns(&self) -> Vec<OutputColumn> {
        let windowed = |base: &str, period: usize| {
            vec![OutputColumn::new(format!("{base}_{period}"), Some(base))]
        };
        match *self {
            IndicatorKind::Sma(p) => windowed("sma", p),
            IndicatorKind::Ema(p) => windowed("ema", p),
            IndicatorKind::Wma(p) => windowed("wma", p),
            IndicatorKind::Rsi(p) => windowed("rsi", p),
            IndicatorKind::Roc(p) => windowed("roc", p),
            IndicatorKind::Atr(p) => windowed("atr", p),
            IndicatorKind::Stddev(p) => windowed("stddev", p),
            IndicatorKind::Adx(p) => windowed("adx", p),
            IndicatorKind::Cci(p) => windowed("cci", p),
            IndicatorKind::Mfi(p) => windowed("mfi", p),
            IndicatorKind::Vwap(p) => windowed("vwap", p),
            IndicatorKind::Obv => vec![OutputColumn::new("obv", None)],
            IndicatorKind::Macd { .. } => vec![
                OutputColumn::new("macd", None),
                OutputColumn::new("macd_signal", None),
                OutputColumn::new("macd_hist", None),
            ],
            IndicatorKind::Bollinger { .. } => vec![
                OutputColumn::new("bb_upper", Some("upperband")),
                OutputColumn::new("bb_middle", Some("middleband")),
                OutputColumn::new("bb_lower", Some("lowerband")),
            ],
        }
    }

    pub fn calculate(&self, bars: &[Bar]) -> IndicatorSeries {
        match *self {
            IndicatorKind::Sma(p) => calculate_sma(bars, p),
            IndicatorKind::Ema(p) => calculate_ema(bars, p),
            IndicatorKind::Wma(p) => calculate_wma(bars, p),
            IndicatorKind::Rsi(p) => calculate_rsi(bars, p),
            IndicatorKind::Roc(p) => calculate_roc(bars, p),
            IndicatorKind::Atr(p) => calculate_atr(bars, p),
            IndicatorKind::Stddev(p) => calculate_stddev(bars, p),
            IndicatorKind::Adx(p) => calculate_adx(bars, p),
            IndicatorKind::Cci(p) => calculate_cci(bars, p),
            IndicatorKind::Mfi(p) => calculate_mfi(bars, p),
            IndicatorKind::Vwap(p) => calculate_vwap(bars, p),
            IndicatorKind::Obv => calculate_obv(bars),
            IndicatorKind::Macd { fast, slow, signal } => calculate_macd(bars, fast, slow, signal),
            IndicatorKind::Bollinger {
                period,
                stddev_mult_x100,
            } => calculate_bollinger(bars, period, stddev_mult_x100),
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Sma(period) => write!(f, "SMA({})", period),
            IndicatorKind::Ema(period) => write!(f, "EMA({})", period),
            IndicatorKind::Wma(period) => write!(f, "WMA({})", period),
            IndicatorKind::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorKind::Roc(period) => write!(f, "ROC({})", period),
            IndicatorKind::Atr(period) => write!(f, "ATR({})", period),
            IndicatorKind::Stddev(period) => write!(f, "STDDEV({})", period),
            IndicatorKind::Adx(period) => write!(f, "ADX({})", period),
            IndicatorKind::Cci(period) => write!(f, "CCI({})", period),
            IndicatorKind::Mfi(period) => write!(f, "MFI({})", period),
            IndicatorKind::Vwap(period) => write!(f, "VWAP({})", period),
            IndicatorKind::Obv => write!(f, "OBV"),
            IndicatorKind::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorKind::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BBANDS({},{})", period, mult)
            }
        }
    }
}

/// Build a single-output series from per-bar optional values.
pub(crate) fn simple_series(
    kind: IndicatorKind,
    bars: &[Bar],
    values: impl IntoIterator<Item = Option<f64>>,
) -> IndicatorSeries {
    let values = bars
        .iter()
        .zip(values)
        .map(|(bar, v)| match v {
            Some(v) => IndicatorPoint::simple(bar.timestamp, v),
            None => IndicatorPoint::warmup(bar.timestamp),
        })
        .collect();
    IndicatorSeries { kind, values }
}
