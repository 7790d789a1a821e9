//! End-of-day bar and closing price point.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One raw end-of-day record for a symbol, as delivered by a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EodBar {
    pub symbol: String,
    #[serde(default)]
    pub exchange: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl EodBar {
    pub fn price_point(&self) -> PricePoint {
        PricePoint {
            date: self.date,
            close: self.close,
        }
    }
}

/// A closing price on a trading date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Leading slice of a date-ordered series with every point dated on or
/// before `date`.
pub fn visible_history(points: &[PricePoint], date: NaiveDate) -> &[PricePoint] {
    let end = points.partition_point(|p| p.date <= date);
    &points[..end]
}
