//! Marketstack REST data source.
//!
//! `GET {base_url}/eod` with `access_key`, `symbols` (comma-joined),
//! `date_from`, `date_to`, `limit` and `offset`. Results are paginated; every
//! page is fetched before anything is returned, and a failure on any page
//! fails the whole fetch. Requests are never retried.

use crate::domain::eod_bar::EodBar;
use crate::domain::error::EodError;
use crate::domain::query::EodQuery;
use crate::ports::config_port::ConfigPort;
use crate::ports::eod_port::EodPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://api.marketstack.com/v1";
pub const DEFAULT_PAGE_LIMIT: usize = 1000;
pub const ACCESS_KEY_ENV: &str = "MARKETSTACK_ACCESS_KEY";

#[derive(Debug, Deserialize)]
struct EodResponse {
    pagination: Pagination,
    data: Vec<MarketstackBar>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
    #[serde(default)]
    pub count: usize,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
struct MarketstackBar {
    symbol: String,
    #[serde(default)]
    exchange: Option<String>,
    date: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

/// One parsed response page.
#[derive(Debug, Clone)]
pub struct EodPage {
    pub pagination: Pagination,
    pub bars: Vec<EodBar>,
    /// Entries in the response before bars without a close were dropped.
    pub raw_count: usize,
}

pub struct MarketstackAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
    access_key: String,
    page_limit: usize,
}

impl MarketstackAdapter {
    pub fn new(
        access_key: String,
        base_url: String,
        page_limit: usize,
        timeout: Duration,
    ) -> Result<Self, EodError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EodError::Network {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_key,
            page_limit: page_limit.max(1),
        })
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, EodError> {
        let access_key = resolve_access_key(config, std::env::var(ACCESS_KEY_ENV).ok())?;
        let base_url = config
            .get_string("data", "base_url")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let page_limit = config.get_int("data", "page_limit", DEFAULT_PAGE_LIMIT as i64);
        let timeout = config.get_int("data", "timeout_secs", 30);
        Self::new(
            access_key,
            base_url,
            page_limit.max(1) as usize,
            Duration::from_secs(timeout.max(1) as u64),
        )
    }

    fn get(&self, path: &str, params: &[(&str, String)]) -> Result<String, EodError> {
        let url = format!("{}/{}", self.base_url, path);
        let mut query: Vec<(&str, String)> = vec![("access_key", self.access_key.clone())];
        query.extend(params.iter().cloned());

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .map_err(|e| EodError::Network {
                reason: format!("GET {url}: {}", e.without_url()),
            })?;

        let status = response.status();
        let body = response.text().map_err(|e| EodError::Network {
            reason: format!("reading body of {url}: {}", e.without_url()),
        })?;

        if !status.is_success() {
            return Err(EodError::Provider {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    fn fetch_page(&self, query: &EodQuery, offset: usize) -> Result<EodPage, EodError> {
        let params = eod_params(query, self.page_limit, offset);
        let body = self.get("eod", &params)?;
        let page = parse_page(&body)?;
        tracing::debug!(
            offset = page.pagination.offset,
            count = page.pagination.count,
            total = page.pagination.total,
            "fetched eod page"
        );
        Ok(page)
    }
}

impl EodPort for MarketstackAdapter {
    fn name(&self) -> &str {
        "marketstack"
    }

    fn fetch_eod(&self, query: &EodQuery) -> Result<Vec<EodBar>, EodError> {
        tracing::info!(
            symbols = %query.normalized_symbols().join(","),
            start = %query.start_date,
            end = %query.end_date,
            "fetching end-of-day data from marketstack"
        );
        collect_pages(|offset| self.fetch_page(query, offset))
    }

    fn fetch_latest(&self, symbols: &[String]) -> Result<Vec<EodBar>, EodError> {
        let params = vec![
            ("symbols", symbols.join(",")),
            ("limit", self.page_limit.to_string()),
        ];
        let body = self.get("eod/latest", &params)?;
        Ok(parse_page(&body)?.bars)
    }
}

/// Query parameters for one `/eod` page (without the access key).
pub fn eod_params(query: &EodQuery, limit: usize, offset: usize) -> Vec<(&'static str, String)> {
    vec![
        ("symbols", query.normalized_symbols().join(",")),
        ("date_from", query.start_date.to_string()),
        ("date_to", query.end_date.to_string()),
        ("limit", limit.to_string()),
        ("offset", offset.to_string()),
    ]
}

/// Fetch the first page, then every following page until `total` is covered.
/// An empty page before that point is a malformed response.
pub fn collect_pages<F>(mut fetch_page: F) -> Result<Vec<EodBar>, EodError>
where
    F: FnMut(usize) -> Result<EodPage, EodError>,
{
    let first = fetch_page(0)?;
    let total = first.pagination.total;
    let step = first.pagination.limit;
    let mut bars = first.bars;

    if step == 0 {
        return Ok(bars);
    }

    let mut offset = step;
    while offset < total {
        let page = fetch_page(offset)?;
        if page.raw_count == 0 {
            return Err(EodError::MalformedResponse {
                reason: format!("empty page at offset {offset} of {total}"),
            });
        }
        bars.extend(page.bars);
        offset += step;
    }

    Ok(bars)
}

/// Parse one `/eod` or `/eod/latest` response body. Bars without a close are
/// dropped.
pub fn parse_page(body: &str) -> Result<EodPage, EodError> {
    let response: EodResponse =
        serde_json::from_str(body).map_err(|e| EodError::MalformedResponse {
            reason: e.to_string(),
        })?;

    let raw_count = response.data.len();
    let mut bars = Vec::with_capacity(raw_count);
    for raw in response.data {
        let Some(close) = raw.close else {
            continue;
        };
        let date = parse_marketstack_date(&raw.date)?;
        bars.push(EodBar {
            symbol: raw.symbol.to_uppercase(),
            exchange: raw.exchange.unwrap_or_default(),
            date,
            open: raw.open.unwrap_or(close),
            high: raw.high.unwrap_or(close),
            low: raw.low.unwrap_or(close),
            close,
            volume: raw.volume.unwrap_or(0.0),
        });
    }

    Ok(EodPage {
        pagination: response.pagination,
        bars,
        raw_count,
    })
}

/// Marketstack dates look like `2022-03-01T00:00:00+0000`; only the day matters.
fn parse_marketstack_date(raw: &str) -> Result<NaiveDate, EodError> {
    raw.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        .ok_or_else(|| EodError::MalformedResponse {
            reason: format!("invalid date: {raw}"),
        })
}

/// Access key precedence: environment, `[data] api_key`, `[data] api_key_path`.
pub fn resolve_access_key(
    config: &dyn ConfigPort,
    env_value: Option<String>,
) -> Result<String, EodError> {
    if let Some(key) = env_value.filter(|k| !k.trim().is_empty()) {
        return Ok(key.trim().to_string());
    }
    if let Some(key) = config
        .get_string("data", "api_key")
        .filter(|k| !k.trim().is_empty())
    {
        return Ok(key.trim().to_string());
    }
    if let Some(path) = config.get_string("data", "api_key_path") {
        let key = fs::read_to_string(&path).map_err(|e| EodError::ConfigInvalid {
            section: "data".into(),
            key: "api_key_path".into(),
            reason: format!("cannot read {path}: {e}"),
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(EodError::ConfigInvalid {
                section: "data".into(),
                key: "api_key_path".into(),
                reason: format!("{path} is empty"),
            });
        }
        return Ok(key.to_string());
    }
    Err(EodError::ConfigMissing {
        section: "data".into(),
        key: "api_key".into(),
    })
}
