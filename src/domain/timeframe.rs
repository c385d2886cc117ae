//! Bar timeframes and their annualization factors.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::BacktestError;

/// Trading days per year used for daily annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Regular session length in minutes (6.5 hours).
const SESSION_MINUTES: f64 = 390.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1w")]
    Weekly,
    #[serde(rename = "1M")]
    Monthly,
}

impl Timeframe {
    /// Number of bars of this timeframe in one trading year.
    pub fn periods_per_year(self) -> f64 {
        match self {
            Timeframe::OneMinute => TRADING_DAYS_PER_YEAR * SESSION_MINUTES,
            Timeframe::FiveMinutes => TRADING_DAYS_PER_YEAR * SESSION_MINUTES / 5.0,
            Timeframe::FifteenMinutes => TRADING_DAYS_PER_YEAR * SESSION_MINUTES / 15.0,
            Timeframe::ThirtyMinutes => TRADING_DAYS_PER_YEAR * SESSION_MINUTES / 30.0,
            Timeframe::OneHour => TRADING_DAYS_PER_YEAR * SESSION_MINUTES / 60.0,
            Timeframe::FourHours => TRADING_DAYS_PER_YEAR * 2.0,
            Timeframe::Daily => TRADING_DAYS_PER_YEAR,
            Timeframe::Weekly => 52.0,
            Timeframe::Monthly => 12.0,
        }
    }

    /// Nominal spacing between consecutive bars, used by the synthetic data
    /// generator.
    pub fn step(self) -> Duration {
        match self {
            Timeframe::OneMinute => Duration::minutes(1),
            Timeframe::FiveMinutes => Duration::minutes(5),
            Timeframe::FifteenMinutes => Duration::minutes(15),
            Timeframe::ThirtyMinutes => Duration::minutes(30),
            Timeframe::OneHour => Duration::hours(1),
            Timeframe::FourHours => Duration::hours(4),
            Timeframe::Daily => Duration::days(1),
            Timeframe::Weekly => Duration::weeks(1),
            Timeframe::Monthly => Duration::days(30),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::OneMinute => "1m",
            Timeframe::FiveMinutes => "5m",
            Timeframe::FifteenMinutes => "15m",
            Timeframe::ThirtyMinutes => "30m",
            Timeframe::OneHour => "1h",
            Timeframe::FourHours => "4h",
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "1w",
            Timeframe::Monthly => "1M",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = BacktestError;

    /// `1M` is a month and `1m` a minute; everything else is case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "1M" {
            return Ok(Timeframe::Monthly);
        }
        match s.to_ascii_lowercase().as_str() {
            "1m" => Ok(Timeframe::OneMinute),
            "5m" => Ok(Timeframe::FiveMinutes),
            "15m" => Ok(Timeframe::FifteenMinutes),
            "30m" => Ok(Timeframe::ThirtyMinutes),
            "1h" => Ok(Timeframe::OneHour),
            "4h" => Ok(Timeframe::FourHours),
            "1d" | "daily" => Ok(Timeframe::Daily),
            "1w" | "weekly" => Ok(Timeframe::Weekly),
            "monthly" => Ok(Timeframe::Monthly),
            _ => Err(BacktestError::ConfigInvalid {
                section: "backtest".into(),
                key: "timeframe".into(),
                reason: format!("unknown timeframe '{s}'"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_distinguishes_minute_and_month() {
        assert_eq!("1m".parse::<Timeframe>().unwrap(), Timeframe::OneMinute);
        assert_eq!("1M".parse::<Timeframe>().unwrap(), Timeframe::Monthly);
        assert_eq!("1D".parse::<Timeframe>().unwrap(), Timeframe::Daily);
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!("2d".parse::<Timeframe>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for tf in [
            Timeframe::OneMinute,
            Timeframe::FourHours,
            Timeframe::Daily,
            Timeframe::Monthly,
        ] {
            assert_eq!(tf.to_string().parse::<Timeframe>().unwrap(), tf);
        }
    }

    #[test]
    fn periods_per_year() {
        assert!((Timeframe::Daily.periods_per_year() - 252.0).abs() < f64::EPSILON);
        assert!((Timeframe::OneHour.periods_per_year() - 1638.0).abs() < 1e-9);
        assert!((Timeframe::OneMinute.periods_per_year() - 98_280.0).abs() < 1e-9);
        assert!((Timeframe::Weekly.periods_per_year() - 52.0).abs() < f64::EPSILON);
    }
}
