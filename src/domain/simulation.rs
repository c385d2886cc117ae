//! Bar-by-bar replay over a unified timeline.
//!
//! Each symbol is either flat or holding one long position. Per time step, in
//! the order the series were given, a symbol with a bar at that timestamp:
//!
//! 1. if open, checks the exit rules (and bracket levels when enabled) and
//!    closes on a hit, staying flat for the rest of the step;
//! 2. if flat, checks the entry rules and opens a sized position.
//!
//! After every symbol is processed one equity point is recorded, marked at each
//! symbol's latest close. On the final step anything still open, including a
//! position opened on that step, is liquidated at its last close before the
//! final point is taken, so every opened position ends as exactly one trade.

use chrono::NaiveDateTime;
use log::{debug, info};
use std::collections::{BTreeSet, HashMap};

use crate::domain::cancel::CancellationToken;
use crate::domain::condition_eval::CompiledRules;
use crate::domain::enriched::EnrichedSeries;
use crate::domain::error::BacktestError;
use crate::domain::portfolio::{EntryResult, Portfolio};
use crate::domain::strategy::RiskManagement;
use crate::ports::progress_port::{ProgressPort, RunStage};

/// Progress share of the whole run covered by the simulation.
pub const SIMULATION_PROGRESS_START: u8 = 20;
pub const SIMULATION_PROGRESS_END: u8 = 90;

/// Optional collaborators of a run.
#[derive(Clone, Copy, Default)]
pub struct RunContext<'a> {
    pub progress: Option<&'a dyn ProgressPort>,
    pub cancel: Option<&'a CancellationToken>,
}

impl<'a> RunContext<'a> {
    pub fn with_progress(mut self, progress: &'a dyn ProgressPort) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancel(mut self, cancel: &'a CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn report(&self, stage: RunStage, percent: u8) {
        if let Some(progress) = self.progress {
            progress.on_progress(stage, percent);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancellationToken::is_cancelled)
    }
}

/// Every distinct timestamp across all series, ascending.
pub fn build_unified_timeline(series: &[EnrichedSeries]) -> Vec<NaiveDateTime> {
    let unique: BTreeSet<NaiveDateTime> = series
        .iter()
        .flat_map(|s| s.rows.iter().map(|row| row.bar.timestamp))
        .collect();
    unique.into_iter().collect()
}

/// Replay `series` into `portfolio`. Stops with [`BacktestError::Cancelled`]
/// when the context's token is set; the portfolio is then partial and should
/// be discarded.
pub fn simulate(
    series: &[EnrichedSeries],
    rules: &CompiledRules,
    risk: &RiskManagement,
    portfolio: &mut Portfolio,
    ctx: &RunContext<'_>,
) -> Result<(), BacktestError> {
    let timeline = build_unified_timeline(series);
    let total_steps = timeline.len();
    let mut cursors = vec![0usize; series.len()];
    let mut last_close: HashMap<String, f64> = HashMap::new();
    let mut last_seen: HashMap<String, NaiveDateTime> = HashMap::new();
    let mut reported_decile = 0usize;

    ctx.report(RunStage::Simulating, SIMULATION_PROGRESS_START);

    for (step, &timestamp) in timeline.iter().enumerate() {
        if ctx.is_cancelled() {
            info!("run cancelled at step {step} of {total_steps}");
            return Err(BacktestError::Cancelled);
        }
        let is_final = step + 1 == total_steps;

        for (sym_idx, symbol_series) in series.iter().enumerate() {
            let cursor = &mut cursors[sym_idx];
            let Some(row) = symbol_series.rows.get(*cursor) else {
                continue;
            };
            if row.bar.timestamp != timestamp {
                continue;
            }
            *cursor += 1;

            let symbol = symbol_series.symbol.as_str();
            let close = row.bar.close;
            last_close.insert(symbol.to_string(), close);
            last_seen.insert(symbol.to_string(), timestamp);

            if let Some(position) = portfolio.get_position(symbol) {
                let signal = rules.exit_signal(row);
                let bracket = risk.bracket_exits
                    && (position.should_stop_loss(close) || position.should_take_profit(close));
                if signal || bracket {
                    debug!(
                        "{timestamp} {symbol}: exit ({})",
                        if signal { "signal" } else { "bracket" }
                    );
                    portfolio.close_position(symbol, close, timestamp)?;
                }
                continue;
            }

            if rules.entry_signal(row) {
                debug!("{timestamp} {symbol}: entry signal");
                if let EntryResult::Entered { quantity, .. } =
                    portfolio.open_position(symbol, close, timestamp, risk)?
                {
                    debug!("{timestamp} {symbol}: holding {quantity}");
                }
            }
        }

        if is_final {
            liquidate(portfolio, &last_close, &last_seen)?;
        }
        portfolio.record_equity(timestamp, &last_close);

        let decile = (step + 1) * 10 / total_steps;
        if decile > reported_decile {
            reported_decile = decile;
            let span = usize::from(SIMULATION_PROGRESS_END - SIMULATION_PROGRESS_START);
            let percent = usize::from(SIMULATION_PROGRESS_START) + span * decile / 10;
            ctx.report(RunStage::Simulating, percent.min(100) as u8);
        }
    }

    Ok(())
}

/// Close every open position at its symbol's last close, in symbol order.
fn liquidate(
    portfolio: &mut Portfolio,
    last_close: &HashMap<String, f64>,
    last_seen: &HashMap<String, NaiveDateTime>,
) -> Result<(), BacktestError> {
    let mut open: Vec<String> = portfolio.positions.keys().cloned().collect();
    open.sort_unstable();
    for symbol in open {
        let Some(position) = portfolio.get_position(&symbol) else {
            continue;
        };
        let price = last_close
            .get(&symbol)
            .copied()
            .unwrap_or(position.entry_price);
        let timestamp = last_seen
            .get(&symbol)
            .copied()
            .unwrap_or(position.entry_timestamp);
        let trade = portfolio.close_position(&symbol, price, timestamp)?;
        info!(
            "{symbol}: liquidated {} @ {price:.4} at end of run, pnl {:.2}",
            trade.quantity, trade.pnl
        );
    }
    Ok(())
}
