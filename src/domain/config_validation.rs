//! Configuration validation.
//!
//! Validates every config field before any data is fetched.

use crate::domain::error::EodError;
use crate::domain::strategy::{
    StrategyKind, DEFAULT_CASH_FRACTION, DEFAULT_LOOKBACK, DEFAULT_MIN_CASH,
};
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

/// Largest page size the marketstack API accepts.
pub const MAX_PAGE_LIMIT: i64 = 1000;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), EodError> {
    validate_backtest_config(config)?;
    validate_momentum_config(config)?;
    validate_data_config(config)?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), EodError> {
    validate_symbols(config)?;
    validate_initial_capital(config)?;
    let (start, end) = validate_dates(config)?;
    validate_evaluate_date(config, start, end)?;
    validate_strategies(config)?;
    Ok(())
}

pub fn validate_momentum_config(config: &dyn ConfigPort) -> Result<(), EodError> {
    if config.get_int("momentum", "lookback", DEFAULT_LOOKBACK as i64) < 1 {
        return Err(invalid("momentum", "lookback", "lookback must be at least 1"));
    }
    if config.get_double("momentum", "min_cash", DEFAULT_MIN_CASH) < 0.0 {
        return Err(invalid("momentum", "min_cash", "min_cash must be non-negative"));
    }
    let fraction = config.get_double("momentum", "cash_fraction", DEFAULT_CASH_FRACTION);
    if fraction <= 0.0 || fraction > 1.0 {
        return Err(invalid(
            "momentum",
            "cash_fraction",
            "cash_fraction must be in (0, 1]",
        ));
    }
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), EodError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "marketstack".to_string());
    match source.trim().to_lowercase().as_str() {
        "marketstack" => {}
        "csv" => match config.get_string("data", "csv_dir") {
            Some(dir) if !dir.trim().is_empty() => {}
            _ => {
                return Err(EodError::ConfigMissing {
                    section: "data".to_string(),
                    key: "csv_dir".to_string(),
                })
            }
        },
        other => {
            return Err(invalid(
                "data",
                "source",
                &format!("unknown source '{other}', expected marketstack or csv"),
            ))
        }
    }

    let page_limit = config.get_int("data", "page_limit", MAX_PAGE_LIMIT);
    if !(1..=MAX_PAGE_LIMIT).contains(&page_limit) {
        return Err(invalid(
            "data",
            "page_limit",
            &format!("page_limit must be between 1 and {MAX_PAGE_LIMIT}"),
        ));
    }
    if config.get_int("data", "cache_max_entries", 32) < 1 {
        return Err(invalid(
            "data",
            "cache_max_entries",
            "cache_max_entries must be at least 1",
        ));
    }
    if config.get_int("data", "timeout_secs", 30) < 1 {
        return Err(invalid("data", "timeout_secs", "timeout_secs must be at least 1"));
    }
    Ok(())
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<(), EodError> {
    match config.get_string("backtest", "symbols") {
        None => Err(EodError::ConfigMissing {
            section: "backtest".to_string(),
            key: "symbols".to_string(),
        }),
        Some(s) => {
            parse_symbols(&s)?;
            Ok(())
        }
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), EodError> {
    let value = config.get_double("backtest", "initial_capital", 1_000_000.0);
    if value <= 0.0 || !value.is_finite() {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(NaiveDate, NaiveDate), EodError> {
    let start_str = config.get_string("backtest", "start_date");
    let end_str = config.get_string("backtest", "end_date");

    let start_date = parse_date(start_str.as_deref(), "backtest", "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "backtest", "end_date")?;

    if start_date > end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok((start_date, end_date))
}

fn validate_evaluate_date(
    config: &dyn ConfigPort,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(), EodError> {
    let Some(raw) = config.get_string("backtest", "evaluate_date") else {
        return Ok(());
    };
    let date = parse_date(Some(&raw), "backtest", "evaluate_date")?;
    if date < start || date > end {
        return Err(invalid(
            "backtest",
            "evaluate_date",
            "evaluate_date must lie within start_date..end_date",
        ));
    }
    Ok(())
}

fn validate_strategies(config: &dyn ConfigPort) -> Result<(), EodError> {
    for name in config.get_list("backtest", "strategies") {
        if StrategyKind::parse(&name).is_none() {
            return Err(invalid(
                "backtest",
                "strategies",
                &format!("unknown strategy '{name}'"),
            ));
        }
    }
    Ok(())
}

/// Parse a required `YYYY-MM-DD` value.
pub fn parse_date(value: Option<&str>, section: &str, key: &str) -> Result<NaiveDate, EodError> {
    match value {
        None => Err(EodError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(
                section,
                key,
                &format!("invalid {key} format, expected YYYY-MM-DD"),
            )
        }),
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> EodError {
    EodError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
