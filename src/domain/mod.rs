//! Core domain types and logic.

pub mod backtest;
pub mod cancel;
pub mod condition;
pub mod condition_eval;
pub mod condition_parser;
pub mod config_validation;
pub mod enriched;
pub mod error;
pub mod indicator;
pub mod indicator_helpers;
pub mod metrics;
pub mod ohlcv;
pub mod portfolio;
pub mod position;
pub mod simulation;
pub mod sizing;
pub mod strategy;
pub mod timeframe;
pub mod universe;
