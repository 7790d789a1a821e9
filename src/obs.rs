//! Tracing subscriber setup.

pub const LOG_ENV: &str = "EODTRADER_LOG";

/// Install the global subscriber. `EODTRADER_LOG` overrides `log_level`;
/// `log_format` is `text` or `json`. Output goes to stderr so reports on
/// stdout stay clean.
pub fn init_tracing(log_level: &str, log_format: &str) -> Result<(), String> {
    let filter = std::env::var(LOG_ENV).unwrap_or_else(|_| log_level.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| format!("invalid log filter: {err}"))?;

    let format = log_format.trim().to_lowercase();
    let result = match format.as_str() {
        "json" => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .try_init(),
        "text" | "" => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init(),
        other => return Err(format!("unknown log format '{other}', expected text or json")),
    };
    // A subscriber may already be installed (tests, repeated calls).
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}
