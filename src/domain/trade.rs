//! Executed trade records.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// +1 for buys, -1 for sells.
    pub fn sign(self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("BUY"),
            Side::Sell => f.write_str("SELL"),
        }
    }
}

/// One executed trade. Never mutated once appended to a trade log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeAction {
    pub symbol: String,
    pub date: NaiveDate,
    pub side: Side,
    pub quantity: i64,
    pub price: f64,
}

impl TradeAction {
    pub fn value(&self) -> f64 {
        self.price * self.quantity as f64
    }

    pub fn signed_quantity(&self) -> i64 {
        self.side.sign() * self.quantity
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "|{} {} of {} at {} on {} for {}|",
            self.side,
            self.quantity,
            self.symbol,
            self.price,
            self.date.format("%Y-%m-%d"),
            self.value()
        )
    }
}
