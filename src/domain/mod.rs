//! Core domain types and logic.

pub mod allocation;
pub mod backtest;
pub mod config_validation;
pub mod eod_bar;
pub mod error;
pub mod evaluation;
pub mod ledger;
pub mod market_data;
pub mod query;
pub mod signal;
pub mod strategy;
pub mod trade;
pub mod universe;
