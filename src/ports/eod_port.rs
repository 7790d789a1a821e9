//! Raw end-of-day data source port.

use crate::domain::eod_bar::EodBar;
use crate::domain::error::EodError;
use crate::domain::query::EodQuery;

pub trait EodPort {
    /// Human-readable source name for logs.
    fn name(&self) -> &str;

    /// Every bar for the query's symbols within its date range.
    fn fetch_eod(&self, query: &EodQuery) -> Result<Vec<EodBar>, EodError>;

    /// Most recent bar per symbol.
    fn fetch_latest(&self, symbols: &[String]) -> Result<Vec<EodBar>, EodError>;
}

impl<T: EodPort + ?Sized> EodPort for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch_eod(&self, query: &EodQuery) -> Result<Vec<EodBar>, EodError> {
        (**self).fetch_eod(query)
    }

    fn fetch_latest(&self, symbols: &[String]) -> Result<Vec<EodBar>, EodError> {
        (**self).fetch_latest(symbols)
    }
}
