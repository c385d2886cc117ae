//! Backtest orchestration: configuration, one full run, and its result.

use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::condition_eval::CompiledRules;
use crate::domain::error::{BacktestError, RunError};
use crate::domain::enriched::IndicatorPipeline;
use crate::domain::metrics::Stats;
use crate::domain::ohlcv::Bar;
use crate::domain::portfolio::{EquityPoint, Portfolio};
use crate::domain::position::Trade;
use crate::domain::simulation::{self, RunContext, SIMULATION_PROGRESS_END};
use crate::domain::strategy::Strategy;
use crate::domain::timeframe::Timeframe;
use crate::ports::progress_port::RunStage;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub run_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub timeframe: Timeframe,
    /// Annual rate subtracted in Sharpe and Sortino.
    pub risk_free_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub run_id: String,
    pub strategy_name: String,
    pub symbols: Vec<String>,
    pub timeframe: Timeframe,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub stats: Stats,
}

/// Run `strategy` over pre-loaded `bars` (keyed by symbol).
///
/// Everything that can be rejected without data (indicators, conditions,
/// rule references) is checked before any series is touched. Any failure,
/// cancellation included, returns no partial result.
pub fn run_backtest(
    strategy: &Strategy,
    bars: &HashMap<String, Vec<Bar>>,
    config: &BacktestConfig,
    ctx: &RunContext<'_>,
) -> Result<BacktestResult, RunError> {
    execute(strategy, bars, config, ctx).map_err(|cause| {
        if matches!(cause, BacktestError::Cancelled) {
            info!("run {} cancelled", config.run_id);
        } else {
            warn!("run {} failed: {cause}", config.run_id);
        }
        RunError::new(config.run_id.clone(), cause)
    })
}

fn execute(
    strategy: &Strategy,
    bars: &HashMap<String, Vec<Bar>>,
    config: &BacktestConfig,
    ctx: &RunContext<'_>,
) -> Result<BacktestResult, BacktestError> {
    info!(
        "run {}: strategy '{}' on {} symbol(s), {}",
        config.run_id,
        strategy.name,
        strategy.symbols.len(),
        config.timeframe
    );
    ctx.report(RunStage::LoadingData, 0);

    if strategy.entry_conditions.is_empty() {
        return Err(BacktestError::EmptyEntryConditions {
            strategy: strategy.name.clone(),
        });
    }
    let pipeline = IndicatorPipeline::new(&strategy.indicators)?;
    let rules = CompiledRules::compile(
        &strategy.entry_conditions,
        &strategy.exit_conditions,
        pipeline.schema(),
    )?;
    if !rules.has_exit_conditions() {
        warn!(
            "strategy '{}' has no exit conditions; positions close only at the end of the run{}",
            strategy.name,
            if strategy.risk.bracket_exits {
                " or on bracket levels"
            } else {
                ""
            }
        );
    }

    let mut series = Vec::with_capacity(strategy.symbols.len());
    for symbol in &strategy.symbols {
        if ctx.is_cancelled() {
            return Err(BacktestError::Cancelled);
        }
        let symbol_bars = bars.get(symbol).ok_or_else(|| BacktestError::NoData {
            symbol: symbol.clone(),
        })?;
        series.push(pipeline.enrich(symbol, symbol_bars)?);
    }
    ctx.report(RunStage::IndicatorsComputed, simulation::SIMULATION_PROGRESS_START);

    let mut portfolio = Portfolio::new(config.initial_capital);
    simulation::simulate(&series, &rules, &strategy.risk, &mut portfolio, ctx)?;

    ctx.report(RunStage::ComputingMetrics, SIMULATION_PROGRESS_END);
    let stats = Stats::compute(
        config.initial_capital,
        &portfolio.equity_curve,
        &portfolio.trades,
        config.timeframe.periods_per_year(),
        config.risk_free_rate,
    );

    info!(
        "run {} finished: {} trade(s), total return {:.2}%, max drawdown {:.2}%",
        config.run_id,
        stats.total_trades,
        stats.total_return * 100.0,
        stats.max_drawdown
    );
    ctx.report(RunStage::Finished, 100);

    Ok(BacktestResult {
        run_id: config.run_id.clone(),
        strategy_name: strategy.name.clone(),
        symbols: strategy.symbols.clone(),
        timeframe: config.timeframe,
        start_date: config.start_date,
        end_date: config.end_date,
        initial_capital: config.initial_capital,
        final_capital: stats.final_equity,
        trades: portfolio.trades,
        equity_curve: portfolio.equity_curve,
        stats,
    })
}
