#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use signalbench::domain::backtest::BacktestConfig;
pub use signalbench::domain::ohlcv::Bar;
use signalbench::domain::condition_parser::{parse_conditions, parse_indicator_specs};
use signalbench::domain::error::BacktestError;
use signalbench::domain::strategy::{RiskManagement, Strategy};
use signalbench::domain::timeframe::Timeframe;
use signalbench::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, BacktestError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(BacktestError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| {
                        let d = b.timestamp.date();
                        d >= start_date && d <= end_date
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(0, 0, 0).unwrap()
}

/// A flat bar: open, high, low and close all equal `close`.
pub fn make_bar(symbol: &str, timestamp: NaiveDateTime, close: f64) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        timestamp,
        open: close,
        high: close,
        low: close,
        close,
        volume: 1_000.0,
    }
}

/// Flat bars on consecutive days starting at `start`.
pub fn make_bars(symbol: &str, start: NaiveDate, closes: &[f64]) -> Vec<Bar> {
    let start = start.and_hms_opt(0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(symbol, start + Duration::days(i as i64), c))
        .collect()
}

/// `count` daily bars following a slow oscillation around `base`.
pub fn generate_bars(symbol: &str, start: NaiveDate, count: usize, base: f64) -> Vec<Bar> {
    let closes: Vec<f64> = (0..count)
        .map(|i| base + (i as f64 * 0.3).sin() * base * 0.1)
        .collect();
    make_bars(symbol, start, &closes)
}

pub fn bars_map(entries: Vec<(&str, Vec<Bar>)>) -> HashMap<String, Vec<Bar>> {
    entries
        .into_iter()
        .map(|(symbol, bars)| (symbol.to_string(), bars))
        .collect()
}

pub fn make_strategy(symbols: &[&str], indicators: &str, entry: &str, exit: &str) -> Strategy {
    Strategy {
        name: "Test Strategy".into(),
        description: String::new(),
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        timeframe: Timeframe::Daily,
        indicators: parse_indicator_specs(indicators).unwrap(),
        entry_conditions: parse_conditions(entry).unwrap(),
        exit_conditions: parse_conditions(exit).unwrap(),
        risk: RiskManagement::default(),
    }
}

pub fn sample_config(initial_capital: f64) -> BacktestConfig {
    BacktestConfig {
        run_id: "test-run".into(),
        start_date: date(2024, 1, 1),
        end_date: date(2024, 12, 31),
        initial_capital,
        timeframe: Timeframe::Daily,
        risk_free_rate: 0.0,
    }
}
