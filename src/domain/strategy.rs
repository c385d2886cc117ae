//! Strategy definition and risk parameters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::condition::Condition;
use crate::domain::condition_parser::{parse_conditions, parse_indicator_specs};
use crate::domain::error::BacktestError;
use crate::domain::indicator::IndicatorSpec;
use crate::domain::timeframe::Timeframe;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingMethod {
    /// shares = cash * risk_per_trade / (price * stop_loss); 10% of cash
    /// when stop_loss is zero.
    RiskBased,
    /// shares = cash * risk_per_trade / price
    Percentage,
    /// shares = min(max_position_size, cash * 0.10) / price
    Fixed,
}

impl SizingMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            SizingMethod::RiskBased => "risk_based",
            SizingMethod::Percentage => "percentage",
            SizingMethod::Fixed => "fixed",
        }
    }
}

impl fmt::Display for SizingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SizingMethod {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "risk_based" => Ok(SizingMethod::RiskBased),
            "percentage" => Ok(SizingMethod::Percentage),
            "fixed" => Ok(SizingMethod::Fixed),
            other => Err(BacktestError::ConfigInvalid {
                section: "risk_management".into(),
                key: "position_sizing_method".into(),
                reason: format!("unknown sizing method '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskManagement {
    pub sizing_method: SizingMethod,
    pub risk_per_trade: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Cap on a single position's value, in currency units.
    pub max_position_size: f64,
    /// Carried for reporting; sizing does not use it.
    pub atr_multiplier: f64,
    /// Also exit at the stop-loss / take-profit levels around the entry price.
    pub bracket_exits: bool,
}

impl Default for RiskManagement {
    fn default() -> Self {
        Self {
            sizing_method: SizingMethod::RiskBased,
            risk_per_trade: 0.02,
            stop_loss: 0.05,
            take_profit: 0.10,
            max_position_size: 10_000.0,
            atr_multiplier: 2.0,
            bracket_exits: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub name: String,
    pub description: String,
    pub symbols: Vec<String>,
    pub timeframe: Timeframe,
    pub indicators: Vec<IndicatorSpec>,
    pub entry_conditions: Vec<Condition>,
    pub exit_conditions: Vec<Condition>,
    pub risk: RiskManagement,
}

/// Built-in strategies available by name.
pub const PRESETS: [&str; 3] = ["ema_crossover", "bollinger_bands", "rsi_reversal"];

struct PresetText {
    name: &'static str,
    description: &'static str,
    timeframe: Timeframe,
    indicators: &'static str,
    entry: &'static str,
    exit: &'static str,
    risk: RiskManagement,
}

impl Strategy {
    /// Build one of the [`PRESETS`] for the given symbols.
    pub fn preset(key: &str, symbols: Vec<String>) -> Result<Self, BacktestError> {
        let text = match key.trim().to_ascii_lowercase().as_str() {
            "ema_crossover" => PresetText {
                name: "EMA Crossover Strategy",
                description: "Trend following on a fast/slow EMA crossover",
                timeframe: Timeframe::Daily,
                indicators: "ema(period=5), ema(period=20), rsi(period=14)",
                entry: "ema_5 crosses_above ema_20",
                exit: "ema_5 crosses_below ema_20",
                risk: RiskManagement {
                    take_profit: 0.15,
                    ..RiskManagement::default()
                },
            },
            "bollinger_bands" => PresetText {
                name: "Bollinger Bands Strategy",
                description: "Mean reversion from the lower band back to the middle band",
                timeframe: Timeframe::OneHour,
                indicators: "bbands(period=20, std_dev=2), rsi(period=14)",
                entry: "close below lowerband",
                exit: "close above middleband",
                risk: RiskManagement {
                    risk_per_trade: 0.015,
                    stop_loss: 0.03,
                    take_profit: 0.06,
                    max_position_size: 15_000.0,
                    atr_multiplier: 1.5,
                    ..RiskManagement::default()
                },
            },
            "rsi_reversal" => PresetText {
                name: "RSI Reversal Strategy",
                description: "Buy oversold, sell overbought",
                timeframe: Timeframe::FourHours,
                indicators: "rsi(period=14), sma(period=50)",
                entry: "rsi below 30",
                exit: "rsi above 70",
                risk: RiskManagement {
                    risk_per_trade: 0.025,
                    stop_loss: 0.04,
                    take_profit: 0.12,
                    max_position_size: 20_000.0,
                    atr_multiplier: 2.5,
                    ..RiskManagement::default()
                },
            },
            other => {
                return Err(BacktestError::ConfigInvalid {
                    section: "strategy".into(),
                    key: "preset".into(),
                    reason: format!(
                        "unknown preset '{other}', expected one of {}",
                        PRESETS.join(", ")
                    ),
                });
            }
        };

        Ok(Strategy {
            name: text.name.to_string(),
            description: text.description.to_string(),
            symbols,
            timeframe: text.timeframe,
            indicators: parse_indicator_specs(text.indicators)?,
            entry_conditions: parse_conditions(text.entry)?,
            exit_conditions: parse_conditions(text.exit)?,
            risk: text.risk,
        })
    }
}
