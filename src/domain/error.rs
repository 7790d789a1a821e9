//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for eodtrader.
#[derive(Debug, thiserror::Error)]
pub enum EodError {
    #[error("no price for {symbol} on {date}")]
    PriceNotFound { symbol: String, date: NaiveDate },

    #[error("cannot trade {symbol} on {date}: price unavailable")]
    PriceUnavailable { symbol: String, date: NaiveDate },

    #[error("invalid quantity {quantity} for {symbol}: must be positive")]
    InvalidQuantity { symbol: String, quantity: i64 },

    #[error("trade in {symbol} on {date} precedes the last logged trade on {last}")]
    OutOfOrderTrade {
        symbol: String,
        date: NaiveDate,
        last: NaiveDate,
    },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("network error: {reason}")]
    Network { reason: String },

    #[error("malformed provider response: {reason}")]
    MalformedResponse { reason: String },

    #[error("malformed cache file {path}: {reason}")]
    MalformedCache { path: String, reason: String },

    #[error("cache error: {reason}")]
    Cache { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    InvalidSymbols(#[from] crate::domain::universe::UniverseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EodError {
    /// Process exit status reported by the CLI for this error.
    pub fn exit_status(&self) -> u8 {
        match self {
            EodError::Io(_) | EodError::MalformedCache { .. } | EodError::Cache { .. } => 1,
            EodError::ConfigParse { .. }
            | EodError::ConfigMissing { .. }
            | EodError::ConfigInvalid { .. }
            | EodError::InvalidSymbols(_) => 2,
            EodError::Provider { .. }
            | EodError::Network { .. }
            | EodError::MalformedResponse { .. } => 3,
            EodError::PriceNotFound { .. }
            | EodError::PriceUnavailable { .. }
            | EodError::InvalidQuantity { .. }
            | EodError::OutOfOrderTrade { .. }
            | EodError::NoData { .. } => 4,
        }
    }
}

impl From<&EodError> for std::process::ExitCode {
    fn from(err: &EodError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
