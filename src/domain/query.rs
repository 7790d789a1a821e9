//! Market data query: which symbols, over which date range.

use chrono::NaiveDate;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EodQuery {
    pub symbols: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl EodQuery {
    pub fn new(symbols: Vec<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        EodQuery {
            symbols,
            start_date,
            end_date,
        }
    }

    /// Upper-cased, sorted, deduplicated symbols.
    pub fn normalized_symbols(&self) -> Vec<String> {
        let set: BTreeSet<String> = self
            .symbols
            .iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        set.into_iter().collect()
    }

    /// Stable key for the (symbol set, date range) pair. Symbol order and
    /// case do not matter.
    pub fn cache_key(&self) -> String {
        let canonical = format!(
            "{}|{}|{}",
            self.normalized_symbols().join(","),
            self.start_date,
            self.end_date
        );
        let hash = blake3::hash(canonical.as_bytes()).to_hex();
        hash.as_str()[..16].to_string()
    }
}
