//! Order sizing.
//!
//! Turns the strategy's risk parameters, current cash and the entry price into
//! a whole-share quantity. The raw size from the sizing method is clamped to
//! `max_position_size` (in currency) and to the available cash; anything
//! below one share means no order.

use crate::domain::strategy::{RiskManagement, SizingMethod};

/// Fraction of cash used when risk-based sizing has no stop distance, and as
/// the budget for fixed sizing.
pub const FALLBACK_CASH_FRACTION: f64 = 0.10;

/// Unclamped share count from the sizing formula.
pub fn raw_shares(risk: &RiskManagement, cash: f64, price: f64) -> f64 {
    match risk.sizing_method {
        SizingMethod::RiskBased => {
            if risk.stop_loss > 0.0 {
                (cash * risk.risk_per_trade) / (price * risk.stop_loss)
            } else {
                cash * FALLBACK_CASH_FRACTION / price
            }
        }
        SizingMethod::Percentage => cash * risk.risk_per_trade / price,
        SizingMethod::Fixed => risk.max_position_size.min(cash * FALLBACK_CASH_FRACTION) / price,
    }
}

/// Whole shares to buy, or 0 when the order should be skipped.
pub fn order_quantity(risk: &RiskManagement, cash: f64, price: f64) -> u64 {
    if !(price.is_finite() && price > 0.0) || !(cash.is_finite() && cash > 0.0) {
        return 0;
    }

    let shares = raw_shares(risk, cash, price)
        .min(risk.max_position_size / price)
        .min(cash / price);
    if !shares.is_finite() || shares < 1.0 {
        return 0;
    }

    let mut quantity = shares.floor() as u64;
    // floor(cash / price) * price can still round above cash
    while quantity > 0 && quantity as f64 * price > cash {
        quantity -= 1;
    }
    quantity
}
