//! Price lookup port consumed by the ledger and the strategy engine.

use crate::domain::eod_bar::PricePoint;
use crate::domain::error::EodError;
use chrono::NaiveDate;

pub trait PricePort {
    /// Closing price of `symbol` on `date`, or `PriceNotFound`.
    fn get_price(&self, symbol: &str, date: NaiveDate) -> Result<f64, EodError>;

    /// Date-ordered closing prices for `symbol` over the loaded range.
    fn get_price_series(&self, symbol: &str) -> Result<&[PricePoint], EodError>;

    /// Ascending, deduplicated union of all dates with at least one price.
    fn trading_dates(&self) -> &[NaiveDate];

    /// Symbols with at least one price, sorted.
    fn symbols(&self) -> Vec<String>;
}
