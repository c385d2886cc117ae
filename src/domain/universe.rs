//! Symbol universe: parsing symbol lists and loading their bars.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use log::info;
use std::collections::{HashMap, HashSet};

/// Parse a comma-separated symbol list, upper-casing each entry. Empty entries
/// and duplicates are rejected.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, BacktestError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(invalid_symbols("empty entry in symbol list".to_string()));
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(invalid_symbols(format!("duplicate symbol {symbol}")));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

fn invalid_symbols(reason: String) -> BacktestError {
    BacktestError::ConfigInvalid {
        section: "strategy".to_string(),
        key: "symbols".to_string(),
        reason,
    }
}

/// Fetch every symbol's bars for the date range. A symbol without bars is a
/// data error; runs are all-or-nothing.
pub fn load_bars(
    data_port: &dyn DataPort,
    symbols: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<HashMap<String, Vec<Bar>>, BacktestError> {
    let mut bars = HashMap::with_capacity(symbols.len());
    for symbol in symbols {
        let series = data_port.fetch_bars(symbol, start_date, end_date)?;
        if series.is_empty() {
            return Err(BacktestError::NoData {
                symbol: symbol.clone(),
            });
        }
        info!("{symbol}: {} bars", series.len());
        bars.insert(symbol.clone(), series);
    }
    Ok(bars)
}
