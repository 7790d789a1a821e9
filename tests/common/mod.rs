#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use eodtrader::domain::eod_bar::EodBar;
use eodtrader::domain::error::EodError;
use eodtrader::domain::query::EodQuery;
use eodtrader::ports::eod_port::EodPort;
use std::cell::Cell;
use std::collections::HashMap;

/// In-memory source that records how often it is asked for data.
pub struct MockEodPort {
    pub data: HashMap<String, Vec<EodBar>>,
    pub errors: HashMap<String, String>,
    pub fetches: Cell<usize>,
}

impl MockEodPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            fetches: Cell::new(0),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<EodBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl EodPort for MockEodPort {
    fn name(&self) -> &str {
        "mock"
    }

    fn fetch_eod(&self, query: &EodQuery) -> Result<Vec<EodBar>, EodError> {
        self.fetches.set(self.fetches.get() + 1);
        let mut bars = Vec::new();
        for symbol in query.normalized_symbols() {
            if let Some(reason) = self.errors.get(&symbol) {
                return Err(EodError::Network {
                    reason: reason.clone(),
                });
            }
            bars.extend(
                self.data
                    .get(&symbol)
                    .into_iter()
                    .flatten()
                    .filter(|b| b.date >= query.start_date && b.date <= query.end_date)
                    .cloned(),
            );
        }
        Ok(bars)
    }

    fn fetch_latest(&self, symbols: &[String]) -> Result<Vec<EodBar>, EodError> {
        Ok(symbols
            .iter()
            .filter_map(|s| self.data.get(s).and_then(|bars| bars.last().cloned()))
            .collect())
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn make_bar(symbol: &str, date_str: &str, close: f64) -> EodBar {
    EodBar {
        symbol: symbol.to_string(),
        exchange: "XNYS".to_string(),
        date: date(date_str),
        open: close,
        high: close,
        low: close,
        close,
        volume: 1_000.0,
    }
}

/// One bar per consecutive day starting at `start`, closing at `closes[i]`.
pub fn make_series(symbol: &str, start: &str, closes: &[f64]) -> Vec<EodBar> {
    let first = date(start);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| EodBar {
            symbol: symbol.to_string(),
            exchange: "XNYS".to_string(),
            date: first + Duration::days(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000.0,
        })
        .collect()
}

/// Ten days of synthetic prices for IBM and CSCO starting 2022-03-01.
pub fn two_symbol_port() -> MockEodPort {
    MockEodPort::new()
        .with_bars(
            "IBM",
            make_series(
                "IBM",
                "2022-03-01",
                &[133.0, 131.5, 134.2, 136.0, 135.1, 137.8, 139.0, 138.2, 140.5, 141.0],
            ),
        )
        .with_bars(
            "CSCO",
            make_series(
                "CSCO",
                "2022-03-01",
                &[55.4, 56.0, 54.8, 53.9, 55.2, 56.7, 57.1, 56.3, 55.8, 58.0],
            ),
        )
}
