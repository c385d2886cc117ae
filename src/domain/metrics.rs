//! Performance statistics over an equity curve and a trade ledger.
//!
//! Ratios are fractions except `max_drawdown`, which is in percentage points.
//! Every field is finite: degenerate inputs (no trades, flat equity, a single
//! point) produce zeros, and a profit factor with no losing trades is reported
//! as [`PROFIT_FACTOR_CAP`].

use serde::{Deserialize, Serialize};

use crate::domain::portfolio::EquityPoint;
use crate::domain::position::Trade;

/// Profit factor reported when there are winning trades but no losing ones.
pub const PROFIT_FACTOR_CAP: f64 = 1_000_000.0;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stats {
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    /// Largest peak-to-trough decline, percentage points.
    pub max_drawdown: f64,
    /// Longest run of steps spent below a prior peak.
    pub max_drawdown_duration: usize,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub breakeven_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_trade_duration_days: f64,
    pub final_equity: f64,
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

impl Stats {
    /// `periods_per_year` annualizes per-step returns (252 for daily bars);
    /// `risk_free_rate` is per year.
    pub fn compute(
        initial_capital: f64,
        equity_curve: &[EquityPoint],
        trades: &[Trade],
        periods_per_year: f64,
        risk_free_rate: f64,
    ) -> Self {
        let final_equity = equity_curve
            .last()
            .map(|p| p.total_equity)
            .unwrap_or(initial_capital);

        let total_return = if initial_capital > 0.0 {
            final_equity / initial_capital - 1.0
        } else {
            0.0
        };

        let years = equity_curve.len() as f64 / periods_per_year;
        let annualized_return = if years > 0.0 && total_return > -1.0 {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);
        let step_rf = if periods_per_year > 0.0 {
            risk_free_rate / periods_per_year
        } else {
            0.0
        };
        let (sharpe_ratio, sortino_ratio) =
            compute_risk_adjusted(equity_curve, step_rf, periods_per_year);

        let mut winning_trades = 0usize;
        let mut losing_trades = 0usize;
        let mut breakeven_trades = 0usize;
        let mut gross_profit = 0.0_f64;
        let mut gross_loss = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_duration_days = 0.0_f64;

        for trade in trades {
            let pnl = trade.pnl;
            if trade.is_winner() {
                winning_trades += 1;
                gross_profit += pnl;
                largest_win = largest_win.max(pnl);
            } else if trade.is_loser() {
                losing_trades += 1;
                gross_loss += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            } else {
                breakeven_trades += 1;
            }
            total_duration_days += trade.duration_days();
        }

        let total_trades = trades.len();
        let win_rate = if total_trades > 0 {
            winning_trades as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if gross_profit > 0.0 {
            PROFIT_FACTOR_CAP
        } else {
            0.0
        };

        let avg_win = if winning_trades > 0 {
            gross_profit / winning_trades as f64
        } else {
            0.0
        };
        let avg_loss = if losing_trades > 0 {
            gross_loss / losing_trades as f64
        } else {
            0.0
        };
        let avg_trade_duration_days = if total_trades > 0 {
            total_duration_days / total_trades as f64
        } else {
            0.0
        };

        Stats {
            total_return: finite_or_zero(total_return),
            annualized_return: finite_or_zero(annualized_return),
            sharpe_ratio: finite_or_zero(sharpe_ratio),
            sortino_ratio: finite_or_zero(sortino_ratio),
            max_drawdown: finite_or_zero(max_drawdown),
            max_drawdown_duration,
            total_trades,
            winning_trades,
            losing_trades,
            breakeven_trades,
            win_rate: finite_or_zero(win_rate),
            profit_factor: finite_or_zero(profit_factor.min(PROFIT_FACTOR_CAP)),
            gross_profit: finite_or_zero(gross_profit),
            gross_loss: finite_or_zero(gross_loss),
            avg_win: finite_or_zero(avg_win),
            avg_loss: finite_or_zero(avg_loss),
            largest_win: finite_or_zero(largest_win),
            largest_loss: finite_or_zero(largest_loss),
            avg_trade_duration_days: finite_or_zero(avg_trade_duration_days),
            final_equity: finite_or_zero(final_equity),
        }
    }

    pub fn all_finite(&self) -> bool {
        [
            self.total_return,
            self.annualized_return,
            self.sharpe_ratio,
            self.sortino_ratio,
            self.max_drawdown,
            self.win_rate,
            self.profit_factor,
            self.gross_profit,
            self.gross_loss,
            self.avg_win,
            self.avg_loss,
            self.largest_win,
            self.largest_loss,
            self.avg_trade_duration_days,
            self.final_equity,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// (max drawdown in percent, longest drawdown in steps)
fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.total_equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0usize;
    let mut current_dd_duration = 0usize;

    for point in equity_curve {
        if point.total_equity >= peak {
            peak = point.total_equity;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - point.total_equity) / peak;
            max_dd = max_dd.max(dd);
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        }
    }

    (max_dd * 100.0, max_dd_duration)
}

/// Annualized (sharpe, sortino) from step-over-step returns, using population
/// standard deviation. Zero when there is no variation.
fn compute_risk_adjusted(
    equity_curve: &[EquityPoint],
    step_rf: f64,
    periods_per_year: f64,
) -> (f64, f64) {
    if equity_curve.len() < 2 {
        return (0.0, 0.0);
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].total_equity;
            let curr = w[1].total_equity;
            if prev > 0.0 { (curr - prev) / prev } else { 0.0 }
        })
        .collect();

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;
    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    let excess_return = mean - step_rf;
    let annualizer = periods_per_year.max(0.0).sqrt();

    let sharpe = if stddev > 0.0 {
        (excess_return / stddev) * annualizer
    } else {
        0.0
    };

    let downside_sq: f64 = returns
        .iter()
        .filter(|&&r| r < step_rf)
        .map(|&r| (r - step_rf).powi(2))
        .sum();
    let downside_stddev = (downside_sq / n).sqrt();

    let sortino = if downside_stddev > 0.0 {
        (excess_return / downside_stddev) * annualizer
    } else {
        0.0
    };

    (sharpe, sortino)
}
