//! Result persistence port.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BacktestError;
use std::path::Path;

/// Port for writing a finished run somewhere durable.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), BacktestError>;
}
