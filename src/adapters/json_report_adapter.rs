//! JSON report adapter implementing ReportPort.
//!
//! Writes the whole result (stats, trades, equity curve) as pretty JSON.

use std::fs;
use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BacktestError;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Default)]
pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, result: &BacktestResult) -> Result<String, BacktestError> {
        Ok(serde_json::to_string_pretty(result)?)
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), BacktestError> {
        let json = self.render(result)?;
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(output_path, json)?;
        Ok(())
    }
}
