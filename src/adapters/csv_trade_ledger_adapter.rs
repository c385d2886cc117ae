//! Trade ledger as CSV, one row per closed trade.

use std::fs;
use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BacktestError;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Default)]
pub struct CsvTradeLedgerAdapter;

impl CsvTradeLedgerAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportPort for CsvTradeLedgerAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), BacktestError> {
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let to_err = |e: csv::Error| BacktestError::Io(std::io::Error::other(e.to_string()));
        let mut writer = csv::Writer::from_path(output_path).map_err(to_err)?;
        for trade in &result.trades {
            writer.serialize(trade).map_err(to_err)?;
        }
        writer.flush()?;
        Ok(())
    }
}
