//! Market data provider: memo, then disk cache, then the raw source.

use crate::adapters::json_cache::JsonCache;
use crate::domain::eod_bar::EodBar;
use crate::domain::error::EodError;
use crate::domain::market_data::MarketData;
use crate::domain::query::EodQuery;
use crate::ports::eod_port::EodPort;
use std::collections::VecDeque;

pub const DEFAULT_MEMO_CAPACITY: usize = 8;

/// Where a `load` was answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    Memo,
    Disk,
    Source,
}

pub struct MarketDataProvider<S: EodPort> {
    source: S,
    cache: Option<JsonCache>,
    memo: VecDeque<(String, MarketData)>,
    memo_capacity: usize,
    last_origin: Option<LoadOrigin>,
}

impl<S: EodPort> MarketDataProvider<S> {
    pub fn new(source: S, cache: Option<JsonCache>) -> Self {
        Self::with_memo_capacity(source, cache, DEFAULT_MEMO_CAPACITY)
    }

    pub fn with_memo_capacity(source: S, cache: Option<JsonCache>, memo_capacity: usize) -> Self {
        Self {
            source,
            cache,
            memo: VecDeque::new(),
            memo_capacity: memo_capacity.max(1),
            last_origin: None,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> Option<&JsonCache> {
        self.cache.as_ref()
    }

    pub fn last_origin(&self) -> Option<LoadOrigin> {
        self.last_origin
    }

    /// Market data for `query`. Each (symbol set, date range) is fetched from
    /// the source at most once while it stays cached.
    pub fn load(&mut self, query: &EodQuery) -> Result<MarketData, EodError> {
        let key = query.cache_key();

        if let Some(pos) = self.memo.iter().position(|(k, _)| *k == key) {
            if let Some(entry) = self.memo.remove(pos) {
                let data = entry.1.clone();
                self.memo.push_back(entry);
                self.last_origin = Some(LoadOrigin::Memo);
                return Ok(data);
            }
        }

        let (bars, origin) = match self.load_from_disk(query)? {
            Some(bars) => (bars, LoadOrigin::Disk),
            None => (self.fetch_from_source(query)?, LoadOrigin::Source),
        };

        let data = MarketData::from_bars(bars, query.start_date, query.end_date);
        tracing::info!(name = %data.name(), origin = ?origin, "market data loaded");
        self.remember(key, data.clone());
        self.last_origin = Some(origin);
        Ok(data)
    }

    /// Drop any cached copy of `query` and fetch it again from the source.
    pub fn refresh(&mut self, query: &EodQuery) -> Result<MarketData, EodError> {
        let key = query.cache_key();
        self.memo.retain(|(k, _)| *k != key);
        if let Some(cache) = &self.cache {
            cache.invalidate(query)?;
        }
        self.load(query)
    }

    /// Most recent bar per symbol, always from the source.
    pub fn latest(&self, symbols: &[String]) -> Result<Vec<EodBar>, EodError> {
        self.source.fetch_latest(symbols)
    }

    fn load_from_disk(&self, query: &EodQuery) -> Result<Option<Vec<EodBar>>, EodError> {
        match &self.cache {
            Some(cache) => cache.load(query),
            None => Ok(None),
        }
    }

    fn fetch_from_source(&self, query: &EodQuery) -> Result<Vec<EodBar>, EodError> {
        let bars = self.source.fetch_eod(query)?;
        tracing::info!(source = self.source.name(), bars = bars.len(), "fetched");
        match &self.cache {
            Some(cache) if !bars.is_empty() => cache.store(query, self.source.name(), &bars)?,
            Some(_) => tracing::warn!("source returned no bars, not caching"),
            None => {}
        }
        Ok(bars)
    }

    fn remember(&mut self, key: String, data: MarketData) {
        if self.memo.len() >= self.memo_capacity {
            self.memo.pop_front();
        }
        self.memo.push_back((key, data));
    }
}
