//! CLI integration tests for command orchestration.
//!
//! Tests cover:
//! - Config parsing (build_strategy, build_backtest_config, build_data_port)
//! - Dry-run and validate with real INI files on disk
//! - generate-data followed by a CSV-backed backtest
//! - Full runs on synthetic data with JSON and trade ledger output
//! - Exit codes per failure class

mod common;

use clap::Parser;
use common::*;
use signalbench::adapters::file_config_adapter::FileConfigAdapter;
use signalbench::cli::{self, Cli};
use signalbench::domain::error::BacktestError;
use signalbench::domain::strategy::SizingMethod;
use signalbench::domain::timeframe::Timeframe;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

// ExitCode has no PartialEq; compare through Debug.
fn same_code(actual: ExitCode, expected: u8) -> bool {
    format!("{actual:?}") == format!("{:?}", ExitCode::from(expected))
}

fn run_cli(args: &[&str]) -> ExitCode {
    let mut argv = vec!["signalbench"];
    argv.extend_from_slice(args);
    cli::run(Cli::parse_from(argv))
}

const SYNTHETIC_INI: &str = r#"
# synthetic run
[backtest]
run_id = synthetic-ema
initial_capital = 100000
risk_free_rate = 0.02
start_date = 2023-01-01
end_date = 2023-12-31
timeframe = 1d
data_source = synthetic
seed = 7
start_price = 120

[strategy]
name = EMA Crossover
description = fast over slow
symbols = AAPL, MSFT
indicators = ema(period=5), ema(period=20), rsi(period=14)
entry_conditions = ema_5 crosses_above ema_20; rsi below 70
exit_conditions = ema_5 crosses_below ema_20; rsi above 80

[risk_management]
position_sizing_method = risk_based
risk_per_trade = 0.02
stop_loss = 0.05
take_profit = 0.15
max_position_size = 20000
"#;

fn csv_ini(data_dir: &Path) -> String {
    format!(
        r#"
[backtest]
initial_capital = 50000
start_date = 2024-01-01
end_date = 2024-06-30
data_source = csv
data_dir = {}

[strategy]
name = SMA Cross
symbols = BHP,CBA
indicators = sma(period=5), sma(period=15)
entry_conditions = sma_5 crosses_above sma_15
exit_conditions = sma_5 crosses_below sma_15
"#,
        data_dir.display()
    )
}

mod config_loading {
    use super::*;

    #[test]
    fn strategy_and_run_config_from_file() {
        let file = write_temp_ini(SYNTHETIC_INI);
        let config = FileConfigAdapter::from_file(file.path()).unwrap();

        let strategy = cli::build_strategy(&config).unwrap();
        assert_eq!(strategy.name, "EMA Crossover");
        assert_eq!(strategy.symbols, vec!["AAPL", "MSFT"]);
        assert_eq!(strategy.indicators.len(), 3);
        assert_eq!(strategy.entry_conditions.len(), 2);
        assert_eq!(strategy.exit_conditions.len(), 2);
        assert_eq!(strategy.risk.sizing_method, SizingMethod::RiskBased);
        assert!((strategy.risk.max_position_size - 20_000.0).abs() < f64::EPSILON);

        let bt = cli::build_backtest_config(&config, &strategy).unwrap();
        assert_eq!(bt.run_id, "synthetic-ema");
        assert_eq!(bt.start_date, date(2023, 1, 1));
        assert_eq!(bt.end_date, date(2023, 12, 31));
        assert_eq!(bt.timeframe, Timeframe::Daily);
        assert!((bt.risk_free_rate - 0.02).abs() < f64::EPSILON);
    }

    #[test]
    fn preset_strategy() {
        let file = write_temp_ini(
            "[backtest]\nstart_date = 2024-01-01\nend_date = 2024-03-01\n\n[strategy]\nsymbols = SPY\npreset = bollinger_bands\n",
        );
        let config = FileConfigAdapter::from_file(file.path()).unwrap();
        let strategy = cli::build_strategy(&config).unwrap();
        assert_eq!(strategy.name, "Bollinger Bands Strategy");
        assert_eq!(strategy.timeframe, Timeframe::OneHour);
        assert!((strategy.risk.stop_loss - 0.03).abs() < f64::EPSILON);
    }

    #[test]
    fn bad_risk_value_rejected() {
        let config = FileConfigAdapter::from_string(
            "[strategy]\nsymbols = SPY\nentry_conditions = close above 1\n[risk_management]\nstop_loss = lots\n",
        )
        .unwrap();
        let err = cli::build_strategy(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { ref key, .. } if key == "stop_loss"));
    }

    #[test]
    fn duplicate_symbols_rejected() {
        let config = FileConfigAdapter::from_string(
            "[strategy]\nsymbols = SPY, spy\nentry_conditions = close above 1\n",
        )
        .unwrap();
        assert!(cli::build_strategy(&config).is_err());
    }

    #[test]
    fn csv_source_without_dir_rejected() {
        let config = FileConfigAdapter::from_string("[backtest]\ndata_source = csv\n").unwrap();
        assert!(cli::build_data_port(&config, Timeframe::Daily).is_err());
    }
}

mod dry_run {
    use super::*;

    #[test]
    fn dry_run_valid_config_succeeds() {
        let file = write_temp_ini(SYNTHETIC_INI);
        let code = cli::run_dry_run(&PathBuf::from(file.path()));
        assert!(same_code(code, 0));
    }

    #[test]
    fn dry_run_missing_file_is_config_error() {
        let code = cli::run_dry_run(Path::new("/nonexistent/path/config.ini"));
        assert!(same_code(code, 2));
    }

    #[test]
    fn dry_run_syntax_error_is_parse_error() {
        let ini = SYNTHETIC_INI.replace("rsi below 70", "rsi sideways 70");
        let file = write_temp_ini(&ini);
        let code = cli::run_dry_run(file.path());
        assert!(same_code(code, 4));
    }

    #[test]
    fn dry_run_undeclared_reference_is_config_error() {
        let ini = SYNTHETIC_INI.replace("rsi above 80", "macd above 0");
        let file = write_temp_ini(&ini);
        let code = cli::run_dry_run(file.path());
        assert!(same_code(code, 2));
    }
}

mod validate {
    use super::*;

    #[test]
    fn validate_accepts_good_strategy() {
        let file = write_temp_ini(SYNTHETIC_INI);
        let code = run_cli(&["validate", "-c", file.path().to_str().unwrap()]);
        assert!(same_code(code, 0));
    }

    #[test]
    fn validate_requires_entry_conditions() {
        let file = write_temp_ini("[strategy]\nsymbols = SPY\nindicators = sma(period=3)\n");
        let code = run_cli(&["validate", "-c", file.path().to_str().unwrap()]);
        assert!(same_code(code, 2));
    }
}

mod end_to_end {
    use super::*;

    #[test]
    fn synthetic_backtest_writes_reports() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_temp_ini(SYNTHETIC_INI);
        let json_path = dir.path().join("result.json");
        let trades_path = dir.path().join("trades.csv");

        let code = run_cli(&[
            "backtest",
            "-c",
            file.path().to_str().unwrap(),
            "-o",
            json_path.to_str().unwrap(),
            "--trades",
            trades_path.to_str().unwrap(),
        ]);
        assert!(same_code(code, 0));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(json["run_id"], "synthetic-ema");
        assert_eq!(json["strategy_name"], "EMA Crossover");
        // 2023 has 260 weekdays
        assert_eq!(json["equity_curve"].as_array().unwrap().len(), 260);
        let trades = json["trades"].as_array().unwrap().len();

        let ledger = std::fs::read_to_string(&trades_path).unwrap();
        if trades > 0 {
            assert_eq!(ledger.lines().count(), trades + 1);
        }
    }

    #[test]
    fn generated_csv_data_backtests() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("bars");

        let code = run_cli(&[
            "generate-data",
            "--symbols",
            "BHP,CBA",
            "--start",
            "2024-01-01",
            "--end",
            "2024-06-30",
            "--seed",
            "11",
            "--out-dir",
            data_dir.to_str().unwrap(),
        ]);
        assert!(same_code(code, 0));
        assert!(data_dir.join("BHP.csv").exists());
        assert!(data_dir.join("CBA.csv").exists());

        let file = write_temp_ini(&csv_ini(&data_dir));
        let json_path = dir.path().join("out/result.json");
        let code = run_cli(&[
            "backtest",
            "-c",
            file.path().to_str().unwrap(),
            "-o",
            json_path.to_str().unwrap(),
        ]);
        assert!(same_code(code, 0));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(json["run_id"], "SMA Cross");
        assert_eq!(json["symbols"].as_array().unwrap().len(), 2);
        assert!(json["stats"]["sharpe_ratio"].is_number());
    }

    #[test]
    fn missing_csv_file_is_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_temp_ini(&csv_ini(dir.path()));
        let code = run_cli(&["backtest", "-c", file.path().to_str().unwrap()]);
        assert!(same_code(code, 5));
    }

    #[test]
    fn generate_data_rejects_bad_dates() {
        let dir = tempfile::tempdir().unwrap();
        let code = run_cli(&[
            "generate-data",
            "--symbols",
            "SPY",
            "--start",
            "01/01/2024",
            "--end",
            "2024-06-30",
            "--out-dir",
            dir.path().to_str().unwrap(),
        ]);
        assert!(same_code(code, 2));
    }
}
