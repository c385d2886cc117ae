//! Portfolio state: cash, open positions, the trade ledger and the equity curve.

use chrono::NaiveDateTime;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::error::PortfolioError;
use crate::domain::position::{Position, Side, Trade};
use crate::domain::sizing::order_quantity;
use crate::domain::strategy::RiskManagement;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub total_equity: f64,
    pub cash_balance: f64,
    pub invested_capital: f64,
}

/// Result of an entry attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered {
        quantity: u64,
        price: f64,
        cost: f64,
    },
    /// Sizing produced less than one share; nothing changed.
    InsufficientCapital,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: HashMap<String, Position>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    next_trade_id: u64,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            positions: HashMap::new(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
            next_trade_id: 1,
        }
    }

    pub fn get_position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    /// Size and open a long position at `price`.
    ///
    /// The size comes from [`order_quantity`]; when it rounds to zero shares
    /// the entry is skipped with [`EntryResult::InsufficientCapital`] and no
    /// state changes. Cash never goes negative.
    pub fn open_position(
        &mut self,
        symbol: &str,
        price: f64,
        timestamp: NaiveDateTime,
        risk: &RiskManagement,
    ) -> Result<EntryResult, PortfolioError> {
        if self.has_position(symbol) {
            return Err(PortfolioError::PositionAlreadyOpen {
                symbol: symbol.to_string(),
            });
        }

        let quantity = order_quantity(risk, self.cash, price);
        if quantity == 0 {
            info!(
                "{symbol}: entry at {price:.4} skipped, cash {:.2} buys no whole share",
                self.cash
            );
            return Ok(EntryResult::InsufficientCapital);
        }

        let cost = quantity as f64 * price;
        self.cash -= cost;

        let (stop_loss, take_profit) = if risk.bracket_exits {
            let stop = if risk.stop_loss > 0.0 {
                price * (1.0 - risk.stop_loss)
            } else {
                0.0
            };
            let target = if risk.take_profit > 0.0 {
                price * (1.0 + risk.take_profit)
            } else {
                0.0
            };
            (stop, target)
        } else {
            (0.0, 0.0)
        };

        self.positions.insert(
            symbol.to_string(),
            Position {
                symbol: symbol.to_string(),
                quantity,
                entry_price: price,
                entry_timestamp: timestamp,
                stop_loss,
                take_profit,
            },
        );
        debug!("{timestamp} {symbol}: bought {quantity} @ {price:.4}");

        Ok(EntryResult::Entered {
            quantity,
            price,
            cost,
        })
    }

    /// Close the open position for `symbol` at `price`, crediting the proceeds
    /// and appending a trade to the ledger.
    pub fn close_position(
        &mut self,
        symbol: &str,
        price: f64,
        timestamp: NaiveDateTime,
    ) -> Result<Trade, PortfolioError> {
        let position =
            self.positions
                .remove(symbol)
                .ok_or_else(|| PortfolioError::NoOpenPosition {
                    symbol: symbol.to_string(),
                })?;

        let proceeds = position.market_value(price);
        self.cash += proceeds;

        let pnl = position.unrealized_pnl(price);
        let basis = position.cost_basis();
        let return_pct = if basis > 0.0 { pnl / basis } else { 0.0 };

        let trade = Trade {
            id: self.next_trade_id,
            symbol: position.symbol,
            side: Side::Long,
            entry_timestamp: position.entry_timestamp,
            entry_price: position.entry_price,
            exit_timestamp: timestamp,
            exit_price: price,
            quantity: position.quantity,
            pnl,
            return_pct,
        };
        self.next_trade_id += 1;
        debug!(
            "{timestamp} {symbol}: sold {} @ {price:.4}, pnl {pnl:.2}",
            trade.quantity
        );
        self.trades.push(trade.clone());
        Ok(trade)
    }

    /// Value of open positions at the given prices. Positions without a price
    /// are valued at their entry price.
    pub fn invested_value(&self, prices: &HashMap<String, f64>) -> f64 {
        self.positions
            .values()
            .map(|pos| {
                let price = prices.get(&pos.symbol).copied().unwrap_or(pos.entry_price);
                pos.market_value(price)
            })
            .sum()
    }

    pub fn total_equity(&self, prices: &HashMap<String, f64>) -> f64 {
        self.cash + self.invested_value(prices)
    }

    /// Append a mark-to-market equity point.
    pub fn record_equity(&mut self, timestamp: NaiveDateTime, prices: &HashMap<String, f64>) {
        let invested = self.invested_value(prices);
        self.equity_curve.push(EquityPoint {
            timestamp,
            total_equity: self.cash + invested,
            cash_balance: self.cash,
            invested_capital: invested,
        });
    }
}
