//! Configuration validation.
//!
//! Validates every field before any data is loaded, so a bad run file fails
//! with a precise `[section] key` error instead of part-way through a run.

use crate::domain::condition_parser::{parse_conditions, parse_indicator_specs};
use crate::domain::error::BacktestError;
use crate::domain::strategy::{PRESETS, RiskManagement, SizingMethod};
use crate::domain::timeframe::Timeframe;
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

/// Data sources the CLI knows how to build.
pub const DATA_SOURCES: [&str; 2] = ["csv", "synthetic"];

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_initial_capital(config)?;
    validate_risk_free_rate(config)?;
    validate_dates(config)?;
    validate_timeframe(config)?;
    validate_data_source(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_symbols(config)?;
    validate_rules(config)?;
    validate_risk_management(&read_risk_management(config, RiskManagement::default())?)?;
    Ok(())
}

/// Range checks on typed risk parameters.
pub fn validate_risk_management(risk: &RiskManagement) -> Result<(), BacktestError> {
    let checks: [(&str, f64, fn(f64) -> bool, &str); 5] = [
        (
            "risk_per_trade",
            risk.risk_per_trade,
            |v| v > 0.0 && v <= 1.0,
            "risk_per_trade must be in (0, 1]",
        ),
        (
            "stop_loss",
            risk.stop_loss,
            |v| (0.0..1.0).contains(&v),
            "stop_loss must be in [0, 1)",
        ),
        (
            "take_profit",
            risk.take_profit,
            |v| v >= 0.0,
            "take_profit must be non-negative",
        ),
        (
            "max_position_size",
            risk.max_position_size,
            |v| v > 0.0,
            "max_position_size must be positive",
        ),
        (
            "atr_multiplier",
            risk.atr_multiplier,
            |v| v >= 0.0,
            "atr_multiplier must be non-negative",
        ),
    ];
    for (key, value, ok, reason) in checks {
        if !value.is_finite() || !ok(value) {
            return Err(invalid("risk_management", key, reason));
        }
    }
    Ok(())
}

/// Read `[risk_management]`, falling back to `defaults` per missing key.
pub fn read_risk_management(
    config: &dyn ConfigPort,
    defaults: RiskManagement,
) -> Result<RiskManagement, BacktestError> {
    const SECTION: &str = "risk_management";
    let sizing_method = match config.get_string(SECTION, "position_sizing_method") {
        Some(s) if !s.trim().is_empty() => s.parse::<SizingMethod>()?,
        _ => defaults.sizing_method,
    };
    Ok(RiskManagement {
        sizing_method,
        risk_per_trade: read_number(config, SECTION, "risk_per_trade", defaults.risk_per_trade)?,
        stop_loss: read_number(config, SECTION, "stop_loss", defaults.stop_loss)?,
        take_profit: read_number(config, SECTION, "take_profit", defaults.take_profit)?,
        max_position_size: read_number(
            config,
            SECTION,
            "max_position_size",
            defaults.max_position_size,
        )?,
        atr_multiplier: read_number(config, SECTION, "atr_multiplier", defaults.atr_multiplier)?,
        bracket_exits: config.get_bool(SECTION, "bracket_exits", defaults.bracket_exits),
    })
}

/// A numeric key, or `default` when absent. Present but unparsable values are
/// rejected rather than silently replaced.
pub fn read_number(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, BacktestError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) if s.trim().is_empty() => Ok(default),
        Some(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(section, key, &format!("'{}' is not a number", s.trim()))),
    }
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, BacktestError> {
    match value {
        None => Err(BacktestError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(
                "backtest",
                field,
                &format!("invalid {field} format, expected YYYY-MM-DD"),
            )
        }),
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> BacktestError {
    BacktestError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let value = read_number(config, "backtest", "initial_capital", 100_000.0)?;
    if value <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let value = read_number(config, "backtest", "risk_free_rate", 0.0)?;
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let start_str = config.get_string("backtest", "start_date");
    let end_str = config.get_string("backtest", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date > end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok(())
}

fn validate_timeframe(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    if let Some(s) = config.get_string("backtest", "timeframe") {
        s.parse::<Timeframe>()?;
    }
    Ok(())
}

fn validate_data_source(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let source = config
        .get_string("backtest", "data_source")
        .map(|s| s.trim().to_ascii_lowercase())
        .unwrap_or_else(|| "csv".to_string());
    match source.as_str() {
        "csv" => match config.get_string("backtest", "data_dir") {
            Some(dir) if !dir.trim().is_empty() => Ok(()),
            _ => Err(BacktestError::ConfigMissing {
                section: "backtest".to_string(),
                key: "data_dir".to_string(),
            }),
        },
        "synthetic" => {
            if config.get_int("backtest", "seed", 42) < 0 {
                return Err(invalid("backtest", "seed", "seed must be non-negative"));
            }
            if read_number(config, "backtest", "start_price", 100.0)? <= 0.0 {
                return Err(invalid(
                    "backtest",
                    "start_price",
                    "start_price must be positive",
                ));
            }
            Ok(())
        }
        other => Err(invalid(
            "backtest",
            "data_source",
            &format!(
                "unknown data source '{other}', expected one of {}",
                DATA_SOURCES.join(", ")
            ),
        )),
    }
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    match config.get_string("strategy", "symbols") {
        Some(s) if !s.trim().is_empty() => parse_symbols(&s).map(|_| ()),
        _ => Err(BacktestError::ConfigMissing {
            section: "strategy".to_string(),
            key: "symbols".to_string(),
        }),
    }
}

/// A preset supplies all three rule keys; any of them given explicitly
/// replaces the preset's value.
fn validate_rules(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let has_preset = match config.get_string("strategy", "preset") {
        Some(preset) => {
            let key = preset.trim().to_ascii_lowercase();
            if !PRESETS.contains(&key.as_str()) {
                return Err(invalid(
                    "strategy",
                    "preset",
                    &format!(
                        "unknown preset '{key}', expected one of {}",
                        PRESETS.join(", ")
                    ),
                ));
            }
            true
        }
        None => false,
    };

    if let Some(indicators) = config.get_string("strategy", "indicators") {
        parse_indicator_specs(&indicators)?;
    }
    match config.get_string("strategy", "entry_conditions") {
        Some(s) if !s.trim().is_empty() => {
            parse_conditions(&s)?;
        }
        _ if has_preset => {}
        _ => {
            return Err(BacktestError::ConfigMissing {
                section: "strategy".to_string(),
                key: "entry_conditions".to_string(),
            });
        }
    }
    if let Some(exit) = config.get_string("strategy", "exit_conditions") {
        parse_conditions(&exit)?;
    }
    Ok(())
}
