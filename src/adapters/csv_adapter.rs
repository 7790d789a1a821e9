//! Offline end-of-day source reading one CSV file per symbol.
//!
//! Layout: `{dir}/{SYMBOL}.csv` with header `date,open,high,low,close,volume`.
//! `exchange` may appear as an optional trailing column.

use crate::domain::eod_bar::EodBar;
use crate::domain::error::EodError;
use crate::domain::query::EodQuery;
use crate::ports::eod_port::EodPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
    #[serde(default)]
    exchange: String,
}

pub struct CsvEodAdapter {
    base_path: PathBuf,
}

impl CsvEodAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol.to_uppercase()))
    }

    /// All bars of one symbol sorted by date, or `None` when the file is absent.
    fn read_symbol(&self, symbol: &str) -> Result<Option<Vec<EodBar>>, EodError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            tracing::warn!(path = %path.display(), "no csv file for symbol");
            return Ok(None);
        }

        let mut rdr = csv::Reader::from_path(&path).map_err(|e| csv_error(&path, e))?;
        let mut bars = Vec::new();
        for row in rdr.deserialize::<CsvRow>() {
            let row = row.map_err(|e| csv_error(&path, e))?;
            bars.push(EodBar {
                symbol: symbol.to_uppercase(),
                exchange: row.exchange,
                date: row.date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(Some(bars))
    }
}

impl EodPort for CsvEodAdapter {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch_eod(&self, query: &EodQuery) -> Result<Vec<EodBar>, EodError> {
        let mut bars = Vec::new();
        for symbol in query.normalized_symbols() {
            if let Some(series) = self.read_symbol(&symbol)? {
                bars.extend(
                    series
                        .into_iter()
                        .filter(|b| b.date >= query.start_date && b.date <= query.end_date),
                );
            }
        }
        Ok(bars)
    }

    fn fetch_latest(&self, symbols: &[String]) -> Result<Vec<EodBar>, EodError> {
        let mut latest = Vec::new();
        for symbol in symbols {
            if let Some(bar) = self.read_symbol(symbol)?.and_then(|s| s.into_iter().last()) {
                latest.push(bar);
            }
        }
        Ok(latest)
    }
}

fn csv_error(path: &Path, err: csv::Error) -> EodError {
    EodError::MalformedResponse {
        reason: format!("{}: {}", path.display(), err),
    }
}
