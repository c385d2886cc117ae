//! Open positions and closed trades.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub quantity: u64,
    pub entry_price: f64,
    pub entry_timestamp: NaiveDateTime,
    /// Bracket levels; 0.0 means unset.
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity as f64 * price
    }

    pub fn cost_basis(&self) -> f64 {
        self.quantity as f64 * self.entry_price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity as f64 * (price - self.entry_price)
    }

    pub fn should_stop_loss(&self, price: f64) -> bool {
        self.stop_loss != 0.0 && price <= self.stop_loss
    }

    pub fn should_take_profit(&self, price: f64) -> bool {
        self.take_profit != 0.0 && price >= self.take_profit
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: u64,
    pub symbol: String,
    pub side: Side,
    pub entry_timestamp: NaiveDateTime,
    pub entry_price: f64,
    pub exit_timestamp: NaiveDateTime,
    pub exit_price: f64,
    pub quantity: u64,
    pub pnl: f64,
    /// pnl / cost basis, as a fraction.
    pub return_pct: f64,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.pnl < 0.0
    }

    /// Holding time in fractional days.
    pub fn duration_days(&self) -> f64 {
        (self.exit_timestamp - self.entry_timestamp).num_seconds() as f64 / 86_400.0
    }
}
