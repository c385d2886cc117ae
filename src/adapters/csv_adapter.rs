//! CSV bar files: one `<SYMBOL>.csv` per symbol under a base directory.
//!
//! Header: `timestamp,open,high,low,close,volume`. Timestamps may be
//! `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` or RFC 3339. Rows are returned in file
//! order; ordering problems are left for series validation to report.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};

pub const CSV_HEADER: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }

    /// Write `bars` to `<base>/<SYMBOL>.csv`, creating the directory if needed.
    pub fn write_bars(&self, symbol: &str, bars: &[Bar]) -> Result<PathBuf, BacktestError> {
        fs::create_dir_all(&self.base_path)?;
        let path = self.csv_path(symbol);
        let mut writer = csv::Writer::from_path(&path).map_err(|e| csv_error(&path, e))?;
        writer
            .write_record(CSV_HEADER)
            .map_err(|e| csv_error(&path, e))?;
        for bar in bars {
            writer
                .write_record([
                    bar.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                    bar.open.to_string(),
                    bar.high.to_string(),
                    bar.low.to_string(),
                    bar.close.to_string(),
                    bar.volume.to_string(),
                ])
                .map_err(|e| csv_error(&path, e))?;
        }
        writer.flush()?;
        Ok(path)
    }
}

fn csv_error(path: &Path, e: csv::Error) -> BacktestError {
    BacktestError::DataSource {
        reason: format!("{}: {e}", path.display()),
    }
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(ts) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(ts);
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.naive_utc())
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, BacktestError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| BacktestError::DataSource {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| csv_error(&path, e))?.clone();
        let mut columns = [0usize; 6];
        for (slot, name) in columns.iter_mut().zip(CSV_HEADER) {
            *slot = headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| BacktestError::DataSource {
                    reason: format!("{}: missing {name} column", path.display()),
                })?;
        }

        let mut bars = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| csv_error(&path, e))?;
            let field = |i: usize| -> Result<&str, BacktestError> {
                record
                    .get(columns[i])
                    .ok_or_else(|| BacktestError::DataSource {
                        reason: format!(
                            "{}: row {}: missing {} value",
                            path.display(),
                            row + 1,
                            CSV_HEADER[i]
                        ),
                    })
            };
            let number = |i: usize| -> Result<f64, BacktestError> {
                let raw = field(i)?;
                raw.trim().parse::<f64>().map_err(|_| BacktestError::DataSource {
                    reason: format!(
                        "{}: row {}: invalid {} value '{raw}'",
                        path.display(),
                        row + 1,
                        CSV_HEADER[i]
                    ),
                })
            };

            let raw_ts = field(0)?;
            let timestamp = parse_timestamp(raw_ts).ok_or_else(|| BacktestError::DataSource {
                reason: format!(
                    "{}: row {}: invalid timestamp '{raw_ts}'",
                    path.display(),
                    row + 1
                ),
            })?;
            let date = timestamp.date();
            if date < start_date || date > end_date {
                continue;
            }

            bars.push(Bar {
                symbol: symbol.to_string(),
                timestamp,
                open: number(1)?,
                high: number(2)?,
                low: number(3)?,
                close: number(4)?,
                volume: number(5)?,
            });
        }

        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "timestamp,open,high,low,close,volume\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-16,105.0,115.0,100.0,110.0,60000\n\
            2024-01-17,110.0,120.0,105.0,115.0,55000\n";
        fs::write(path.join("AAPL.csv"), csv_content).unwrap();
        fs::write(
            path.join("BAD.csv"),
            "timestamp,open,high,low,close,volume\n2024-01-15,1,2,0.5,abc,10\n",
        )
        .unwrap();

        (dir, path)
    }

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn fetch_bars_returns_correct_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_bars("AAPL", jan(15), jan(17)).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].symbol, "AAPL");
        assert_eq!(bars[0].timestamp, jan(15).and_hms_opt(0, 0, 0).unwrap());
        assert!((bars[0].open - 100.0).abs() < f64::EPSILON);
        assert!((bars[0].close - 105.0).abs() < f64::EPSILON);
        assert!((bars[0].volume - 50_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn fetch_bars_filters_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_bars("AAPL", jan(16), jan(16)).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].timestamp.date(), jan(16));
    }

    #[test]
    fn missing_file_is_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let err = adapter.fetch_bars("XYZ", jan(1), jan(31)).unwrap_err();
        assert!(err.is_data());
    }

    #[test]
    fn bad_number_reports_row() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let err = adapter.fetch_bars("BAD", jan(1), jan(31)).unwrap_err();
        assert!(err.to_string().contains("row 1: invalid close value 'abc'"));
    }

    #[test]
    fn timestamp_formats() {
        let midnight = jan(2).and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-02"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-02 00:00:00"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-02T00:00:00Z"), Some(midnight));
        assert_eq!(parse_timestamp("02/01/2024"), None);
    }

    #[test]
    fn written_bars_read_back() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvAdapter::new(dir.path().join("nested"));
        let bars = vec![Bar {
            symbol: "SPY".into(),
            timestamp: jan(3).and_hms_opt(9, 30, 0).unwrap(),
            open: 1.5,
            high: 2.0,
            low: 1.0,
            close: 1.75,
            volume: 300.0,
        }];
        adapter.write_bars("SPY", &bars).unwrap();
        let loaded = adapter.fetch_bars("SPY", jan(1), jan(31)).unwrap();
        assert_eq!(loaded, bars);
    }
}
