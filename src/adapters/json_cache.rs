//! On-disk JSON cache of fetched end-of-day bars.
//!
//! Layout: `{cache_dir}/eod-{key}.json`, one file per (symbol set, date range)
//! query. Writes go to `.tmp` and are renamed into place. When more than
//! `max_entries` files exist the oldest by `fetched_at` are evicted.

use crate::domain::eod_bar::EodBar;
use crate::domain::error::EodError;
use crate::domain::query::EodQuery;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CACHE_DIR: &str = ".eodtrader-cache";
pub const DEFAULT_MAX_ENTRIES: usize = 32;

const PREFIX: &str = "eod-";
const EXTENSION: &str = "json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheFile {
    key: String,
    symbols: Vec<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    source: String,
    fetched_at: DateTime<Utc>,
    bars: Vec<EodBar>,
}

/// Summary of one cache file, for listing.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub path: PathBuf,
    pub symbols: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub source: String,
    pub bar_count: usize,
    pub fetched_at: DateTime<Utc>,
}

pub struct JsonCache {
    cache_dir: PathBuf,
    max_entries: usize,
}

impl JsonCache {
    pub fn new(cache_dir: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{PREFIX}{key}.{EXTENSION}"))
    }

    /// Cached bars for `query`, `None` on a miss.
    pub fn load(&self, query: &EodQuery) -> Result<Option<Vec<EodBar>>, EodError> {
        let path = self.entry_path(&query.cache_key());
        if !path.exists() {
            return Ok(None);
        }
        let file = read_cache_file(&path)?;
        tracing::debug!(path = %path.display(), bars = file.bars.len(), "cache hit");
        Ok(Some(file.bars))
    }

    pub fn store(&self, query: &EodQuery, source: &str, bars: &[EodBar]) -> Result<(), EodError> {
        self.store_at(query, source, bars, Utc::now())
    }

    /// `store` with an explicit fetch timestamp.
    pub fn store_at(
        &self,
        query: &EodQuery,
        source: &str,
        bars: &[EodBar],
        fetched_at: DateTime<Utc>,
    ) -> Result<(), EodError> {
        fs::create_dir_all(&self.cache_dir)?;

        let key = query.cache_key();
        let file = CacheFile {
            key: key.clone(),
            symbols: query.normalized_symbols(),
            start_date: query.start_date,
            end_date: query.end_date,
            source: source.to_string(),
            fetched_at,
            bars: bars.to_vec(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|e| EodError::Cache {
            reason: format!("serialization failed: {e}"),
        })?;

        let path = self.entry_path(&key);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            EodError::Cache {
                reason: format!("atomic rename failed: {e}"),
            }
        })?;
        tracing::debug!(path = %path.display(), bars = bars.len(), "cache stored");

        self.evict()?;
        Ok(())
    }

    /// Remove the entry for `query`. Returns whether one existed.
    pub fn invalidate(&self, query: &EodQuery) -> Result<bool, EodError> {
        let path = self.entry_path(&query.cache_key());
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        Ok(true)
    }

    /// Remove every entry. Returns how many were removed.
    pub fn clear(&self) -> Result<usize, EodError> {
        let mut removed = 0;
        for path in self.entry_paths()? {
            fs::remove_file(&path)?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Readable entries, oldest first. Unreadable files are skipped with a
    /// warning.
    pub fn entries(&self) -> Result<Vec<CacheEntry>, EodError> {
        let mut entries = Vec::new();
        for path in self.entry_paths()? {
            match read_cache_file(&path) {
                Ok(file) => entries.push(CacheEntry {
                    key: file.key,
                    path,
                    symbols: file.symbols,
                    start_date: file.start_date,
                    end_date: file.end_date,
                    source: file.source,
                    bar_count: file.bars.len(),
                    fetched_at: file.fetched_at,
                }),
                Err(e) => tracing::warn!(error = %e, "skipping unreadable cache entry"),
            }
        }
        entries.sort_by(|a, b| a.fetched_at.cmp(&b.fetched_at).then(a.key.cmp(&b.key)));
        Ok(entries)
    }

    fn entry_paths(&self) -> Result<Vec<PathBuf>, EodError> {
        if !self.cache_dir.exists() {
            return Ok(Vec::new());
        }
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            let is_entry = path.is_file()
                && path.extension().and_then(|s| s.to_str()) == Some(EXTENSION)
                && path
                    .file_name()
                    .and_then(|s| s.to_str())
                    .is_some_and(|name| name.starts_with(PREFIX));
            if is_entry {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn evict(&self) -> Result<(), EodError> {
        let entries = self.entries()?;
        if entries.len() <= self.max_entries {
            return Ok(());
        }
        let excess = entries.len() - self.max_entries;
        for entry in entries.into_iter().take(excess) {
            tracing::info!(key = %entry.key, "evicting cache entry");
            fs::remove_file(&entry.path)?;
        }
        Ok(())
    }
}

fn read_cache_file(path: &Path) -> Result<CacheFile, EodError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| EodError::MalformedCache {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}
