//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_trade_ledger_adapter::CsvTradeLedgerAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::adapters::log_progress_adapter::LogProgressAdapter;
use crate::adapters::synthetic_adapter::SyntheticAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestResult, run_backtest};
use crate::domain::condition_eval::CompiledRules;
use crate::domain::condition_parser::{parse_conditions, parse_indicator_specs};
use crate::domain::config_validation::{
    parse_date, read_number, read_risk_management, validate_backtest_config,
    validate_risk_management, validate_strategy_config,
};
use crate::domain::enriched::IndicatorPipeline;
use crate::domain::error::BacktestError;
use crate::domain::simulation::RunContext;
use crate::domain::strategy::{RiskManagement, Strategy};
use crate::domain::timeframe::Timeframe;
use crate::domain::universe::{load_bars, parse_symbols};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::progress_port::{ProgressPort, RunStage};
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "signalbench", about = "Declarative strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Write the full result as JSON here (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write the trade ledger as CSV here
        #[arg(long)]
        trades: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a strategy configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Write synthetic bar files for testing
    GenerateData {
        /// Comma-separated symbols
        #[arg(long)]
        symbols: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long, default_value = "1d")]
        timeframe: String,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 100.0)]
        start_price: f64,
        #[arg(long)]
        out_dir: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            output,
            trades,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest_command(&config, output.as_deref(), trades.as_deref())
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::GenerateData {
            symbols,
            start,
            end,
            timeframe,
            seed,
            start_price,
            out_dir,
        } => run_generate_data(&symbols, &start, &end, &timeframe, seed, start_price, &out_dir),
    }
}

fn fail(err: &BacktestError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        fail(&BacktestError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        })
    })
}

fn strategy_key(config: &dyn ConfigPort, key: &str) -> Option<String> {
    config
        .get_string("strategy", key)
        .filter(|s| !s.trim().is_empty())
}

/// Build the strategy from `[strategy]` and `[risk_management]`. A `preset`
/// key supplies rules and risk defaults; explicit keys still override them.
pub fn build_strategy(config: &dyn ConfigPort) -> Result<Strategy, BacktestError> {
    let symbols = match config.get_string("strategy", "symbols") {
        Some(s) if !s.trim().is_empty() => parse_symbols(&s)?,
        _ => {
            return Err(BacktestError::ConfigMissing {
                section: "strategy".into(),
                key: "symbols".into(),
            });
        }
    };

    let mut strategy = match config.get_string("strategy", "preset") {
        Some(preset) => Strategy::preset(&preset, symbols)?,
        None => Strategy {
            name: "Unnamed".to_string(),
            description: String::new(),
            symbols,
            timeframe: Timeframe::Daily,
            indicators: Vec::new(),
            entry_conditions: Vec::new(),
            exit_conditions: Vec::new(),
            risk: RiskManagement::default(),
        },
    };

    if let Some(indicators) = strategy_key(config, "indicators") {
        strategy.indicators = parse_indicator_specs(&indicators)?;
    }
    if let Some(entry) = strategy_key(config, "entry_conditions") {
        strategy.entry_conditions = parse_conditions(&entry)?;
    }
    if let Some(exit) = strategy_key(config, "exit_conditions") {
        strategy.exit_conditions = parse_conditions(&exit)?;
    }

    if let Some(name) = config.get_string("strategy", "name") {
        strategy.name = name;
    }
    if let Some(description) = config.get_string("strategy", "description") {
        strategy.description = description;
    }
    if let Some(timeframe) = config.get_string("backtest", "timeframe") {
        strategy.timeframe = timeframe.parse()?;
    }
    strategy.risk = read_risk_management(config, strategy.risk.clone())?;
    validate_risk_management(&strategy.risk)?;

    if strategy.entry_conditions.is_empty() {
        return Err(BacktestError::EmptyEntryConditions {
            strategy: strategy.name.clone(),
        });
    }
    Ok(strategy)
}

pub fn build_backtest_config(
    config: &dyn ConfigPort,
    strategy: &Strategy,
) -> Result<BacktestConfig, BacktestError> {
    let start_date = parse_date(
        config.get_string("backtest", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = parse_date(
        config.get_string("backtest", "end_date").as_deref(),
        "end_date",
    )?;

    Ok(BacktestConfig {
        run_id: config
            .get_string("backtest", "run_id")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| strategy.name.clone()),
        start_date,
        end_date,
        initial_capital: read_number(config, "backtest", "initial_capital", 100_000.0)?,
        timeframe: strategy.timeframe,
        risk_free_rate: read_number(config, "backtest", "risk_free_rate", 0.0)?,
    })
}

/// The bar source named by `[backtest] data_source`.
pub fn build_data_port(
    config: &dyn ConfigPort,
    timeframe: Timeframe,
) -> Result<Box<dyn DataPort>, BacktestError> {
    let source = config
        .get_string("backtest", "data_source")
        .map(|s| s.trim().to_ascii_lowercase())
        .unwrap_or_else(|| "csv".to_string());
    match source.as_str() {
        "synthetic" => {
            let seed = config.get_int("backtest", "seed", 42).max(0) as u64;
            let start_price = read_number(config, "backtest", "start_price", 100.0)?;
            Ok(Box::new(SyntheticAdapter::new(seed, timeframe, start_price)))
        }
        "csv" => {
            let dir = config
                .get_string("backtest", "data_dir")
                .ok_or_else(|| BacktestError::ConfigMissing {
                    section: "backtest".into(),
                    key: "data_dir".into(),
                })?;
            Ok(Box::new(CsvAdapter::new(PathBuf::from(dir.trim()))))
        }
        other => Err(BacktestError::ConfigInvalid {
            section: "backtest".into(),
            key: "data_source".into(),
            reason: format!("unknown data source '{other}'"),
        }),
    }
}

/// Validate both sections and build everything a run needs up front.
fn prepare(config: &dyn ConfigPort) -> Result<(Strategy, BacktestConfig), BacktestError> {
    validate_backtest_config(config)?;
    validate_strategy_config(config)?;
    let strategy = build_strategy(config)?;
    let bt_config = build_backtest_config(config, &strategy)?;
    Ok((strategy, bt_config))
}

fn run_backtest_command(
    config_path: &Path,
    output_path: Option<&Path>,
    trades_path: Option<&Path>,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let (strategy, bt_config) = match prepare(&adapter) {
        Ok(prepared) => prepared,
        Err(e) => return fail(&e),
    };
    eprintln!("Loading strategy: {}", strategy.name);

    // Stage 2: Fetch bars

    let data_port = match build_data_port(&adapter, bt_config.timeframe) {
        Ok(port) => port,
        Err(e) => return fail(&e),
    };

    let progress = LogProgressAdapter::default();
    progress.on_progress(RunStage::LoadingData, 0);
    eprintln!(
        "Loading {} symbol(s), {} to {}",
        strategy.symbols.len(),
        bt_config.start_date,
        bt_config.end_date
    );
    let bars = match load_bars(
        data_port.as_ref(),
        &strategy.symbols,
        bt_config.start_date,
        bt_config.end_date,
    ) {
        Ok(bars) => bars,
        Err(e) => return fail(&e),
    };

    // Stage 3: Run
    let ctx = RunContext::default().with_progress(&progress);
    let result = match run_backtest(&strategy, &bars, &bt_config, &ctx) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e.cause).into();
        }
    };

    print_summary(&result);

    // Stage 4: Write reports
    let report = JsonReportAdapter::new();
    match output_path {
        Some(path) => {
            if let Err(e) = report.write(&result, path) {
                return fail(&e);
            }
            eprintln!("\nResult written to: {}", path.display());
        }
        None => match report.render(&result) {
            Ok(json) => println!("{json}"),
            Err(e) => return fail(&e),
        },
    }

    if let Some(path) = trades_path {
        if let Err(e) = CsvTradeLedgerAdapter::new().write(&result, path) {
            return fail(&e);
        }
        eprintln!("Trade ledger written to: {}", path.display());
    }

    ExitCode::SUCCESS
}

fn print_summary(result: &BacktestResult) {
    let stats = &result.stats;
    eprintln!("\n=== Results: {} ===", result.strategy_name);
    eprintln!("Initial Capital:  {:.2}", result.initial_capital);
    eprintln!("Final Capital:    {:.2}", result.final_capital);
    eprintln!("Total Return:     {:.2}%", stats.total_return * 100.0);
    eprintln!("Annualized:       {:.2}%", stats.annualized_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", stats.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", stats.sortino_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", stats.max_drawdown);
    eprintln!("Total Trades:     {}", stats.total_trades);
    eprintln!("Win Rate:         {:.1}%", stats.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", stats.profit_factor);
}

/// Print the first rule key that fails to parse, with a caret under the
/// offending position.
fn print_parse_context(config: &dyn ConfigPort) {
    for key in ["indicators", "entry_conditions", "exit_conditions"] {
        let Some(text) = config.get_string("strategy", key) else {
            continue;
        };
        let parsed = if key == "indicators" {
            parse_indicator_specs(&text).map(|_| ())
        } else {
            parse_conditions(&text).map(|_| ())
        };
        if let Err(e) = parsed {
            eprintln!("  {key}:\n{}", e.display_with_context(&text));
            return;
        }
    }
}

/// Compile the rules against the indicator schema and print them.
fn describe_rules(strategy: &Strategy) -> Result<(), BacktestError> {
    let pipeline = IndicatorPipeline::new(&strategy.indicators)?;
    CompiledRules::compile(
        &strategy.entry_conditions,
        &strategy.exit_conditions,
        pipeline.schema(),
    )?;

    eprintln!("\nIndicators:");
    for kind in pipeline.kinds() {
        eprintln!("  {kind}");
    }
    eprintln!("\nColumns: {}", pipeline.schema().keys().join(", "));
    eprintln!("\nEntry (all must hold):");
    for condition in &strategy.entry_conditions {
        eprintln!("  {condition}");
    }
    eprintln!("\nExit (any may hold):");
    if strategy.exit_conditions.is_empty() {
        eprintln!("  (none: positions close at the end of the run)");
    }
    for condition in &strategy.exit_conditions {
        eprintln!("  {condition}");
    }
    let risk = &strategy.risk;
    eprintln!(
        "\nRisk: {} sizing, risk_per_trade {}, stop_loss {}, take_profit {}, max_position_size {}{}",
        risk.sizing_method,
        risk.risk_per_trade,
        risk.stop_loss,
        risk.take_profit,
        risk.max_position_size,
        if risk.bracket_exits {
            ", bracket exits on"
        } else {
            ""
        }
    );
    Ok(())
}

pub fn run_dry_run(config_path: &Path) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let (strategy, bt_config) = match prepare(&adapter) {
        Ok(prepared) => prepared,
        Err(e) => {
            if matches!(e, BacktestError::ConditionParse(_)) {
                print_parse_context(&adapter);
            }
            return fail(&e);
        }
    };
    eprintln!("Config validated successfully");
    eprintln!("\nStrategy: {}", strategy.name);
    if let Err(e) = describe_rules(&strategy) {
        return fail(&e);
    }

    eprintln!("\nRun:");
    eprintln!("  run_id: {}", bt_config.run_id);
    eprintln!("  symbols: {}", strategy.symbols.join(", "));
    eprintln!("  timeframe: {}", bt_config.timeframe);
    eprintln!("  range: {} to {}", bt_config.start_date, bt_config.end_date);
    eprintln!("  initial_capital: {:.2}", bt_config.initial_capital);

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating strategy: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let strategy = match validate_strategy_config(&adapter).and_then(|()| build_strategy(&adapter))
    {
        Ok(s) => s,
        Err(e) => {
            if matches!(e, BacktestError::ConditionParse(_)) {
                print_parse_context(&adapter);
            }
            return fail(&e);
        }
    };

    eprintln!("\nStrategy: {}", strategy.name);
    if let Err(e) = describe_rules(&strategy) {
        return fail(&e);
    }

    eprintln!("\nStrategy configuration is valid.");
    ExitCode::SUCCESS
}

fn parse_cli_date(value: &str, key: &str) -> Result<NaiveDate, BacktestError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| BacktestError::ConfigInvalid {
        section: "generate-data".into(),
        key: key.into(),
        reason: "invalid date format (expected YYYY-MM-DD)".into(),
    })
}

fn run_generate_data(
    symbols: &str,
    start: &str,
    end: &str,
    timeframe: &str,
    seed: u64,
    start_price: f64,
    out_dir: &Path,
) -> ExitCode {
    let symbols = match parse_symbols(symbols) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let (start, end) = match (parse_cli_date(start, "start"), parse_cli_date(end, "end")) {
        (Ok(start), Ok(end)) => (start, end),
        (Err(e), _) | (_, Err(e)) => return fail(&e),
    };
    let timeframe: Timeframe = match timeframe.parse() {
        Ok(tf) => tf,
        Err(e) => return fail(&e),
    };
    if !(start_price.is_finite() && start_price > 0.0) {
        return fail(&BacktestError::ConfigInvalid {
            section: "generate-data".into(),
            key: "start_price".into(),
            reason: "start_price must be positive".into(),
        });
    }

    let generator = SyntheticAdapter::new(seed, timeframe, start_price);
    let writer = CsvAdapter::new(out_dir.to_path_buf());
    for symbol in &symbols {
        let bars = generator.generate(symbol, start, end);
        match writer.write_bars(symbol, &bars) {
            Ok(path) => eprintln!("  {symbol}: {} bars -> {}", bars.len(), path.display()),
            Err(e) => return fail(&e),
        }
    }
    ExitCode::SUCCESS
}
