//! Symbol universe: parsing the configured list and resolving which symbols
//! are tradable in the loaded data.

use crate::domain::error::EodError;
use crate::ports::price_port::PricePort;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),

    #[error("symbol list is empty")]
    NoSymbols,
}

/// Parse a comma-separated symbol list, upper-casing and keeping order.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    if input.trim().is_empty() {
        return Err(UniverseError::NoSymbols);
    }

    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

/// Keep the configured symbols that have data, in configured order.
pub fn resolve_tradable(
    prices: &dyn PricePort,
    symbols: &[String],
) -> Result<Vec<String>, EodError> {
    let mut tradable = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        match prices.get_price_series(symbol) {
            Ok(series) if !series.is_empty() => tradable.push(symbol.clone()),
            _ => tracing::warn!(%symbol, "skipping symbol with no data"),
        }
    }

    if tradable.is_empty() {
        return Err(EodError::NoData {
            symbol: symbols.join(","),
        });
    }
    Ok(tradable)
}
