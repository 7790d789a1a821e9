//! Materialised price history for one (symbols, start, end) query.

use crate::domain::eod_bar::{EodBar, PricePoint};
use crate::domain::error::EodError;
use crate::ports::price_port::PricePort;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

#[derive(Debug, Clone)]
struct SymbolSeries {
    points: Vec<PricePoint>,
    date_index: HashMap<NaiveDate, usize>,
}

impl SymbolSeries {
    fn new(points: Vec<PricePoint>) -> Self {
        let date_index = points
            .iter()
            .enumerate()
            .map(|(i, p)| (p.date, i))
            .collect();
        Self { points, date_index }
    }
}

/// Immutable in-memory price data. Built once before a simulation starts.
#[derive(Debug, Clone)]
pub struct MarketData {
    start_date: NaiveDate,
    end_date: NaiveDate,
    series: BTreeMap<String, SymbolSeries>,
    dates: Vec<NaiveDate>,
}

impl MarketData {
    /// Build from raw bars, keeping only dates within `[start_date, end_date]`.
    ///
    /// Bars may arrive in any order. A repeated (symbol, date) keeps the last
    /// close seen.
    pub fn from_bars(bars: Vec<EodBar>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        let mut closes: BTreeMap<String, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
        for bar in bars {
            if bar.date < start_date || bar.date > end_date {
                continue;
            }
            closes
                .entry(bar.symbol.to_uppercase())
                .or_default()
                .insert(bar.date, bar.close);
        }

        let series: BTreeMap<String, SymbolSeries> = closes
            .into_iter()
            .map(|(symbol, by_date)| {
                let points = by_date
                    .into_iter()
                    .map(|(date, close)| PricePoint { date, close })
                    .collect();
                (symbol, SymbolSeries::new(points))
            })
            .collect();

        let dates = build_unified_timeline(&series);

        Self {
            start_date,
            end_date,
            series,
            dates,
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.series.contains_key(symbol)
    }

    pub fn bar_count(&self, symbol: &str) -> usize {
        self.series.get(symbol).map_or(0, |s| s.points.len())
    }

    pub fn name(&self) -> String {
        let symbols: Vec<&str> = self.series.keys().map(String::as_str).collect();
        format!(
            "MarketData - {} - {} - {}",
            self.start_date,
            self.end_date,
            symbols.join(",")
        )
    }
}

impl fmt::Display for MarketData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl PricePort for MarketData {
    fn get_price(&self, symbol: &str, date: NaiveDate) -> Result<f64, EodError> {
        self.series
            .get(symbol)
            .and_then(|s| s.date_index.get(&date).map(|&i| s.points[i].close))
            .ok_or_else(|| EodError::PriceNotFound {
                symbol: symbol.to_string(),
                date,
            })
    }

    fn get_price_series(&self, symbol: &str) -> Result<&[PricePoint], EodError> {
        self.series
            .get(symbol)
            .map(|s| s.points.as_slice())
            .ok_or_else(|| EodError::NoData {
                symbol: symbol.to_string(),
            })
    }

    fn trading_dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    fn symbols(&self) -> Vec<String> {
        self.series.keys().cloned().collect()
    }
}

fn build_unified_timeline(series: &BTreeMap<String, SymbolSeries>) -> Vec<NaiveDate> {
    let unique_dates: BTreeSet<NaiveDate> = series
        .values()
        .flat_map(|s| s.points.iter().map(|p| p.date))
        .collect();
    unique_dates.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn make_bar(symbol: &str, date: &str, close: f64) -> EodBar {
        EodBar {
            symbol: symbol.to_string(),
            exchange: "XNAS".to_string(),
            date: d(date),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        }
    }

    fn sample() -> MarketData {
        MarketData::from_bars(
            vec![
                make_bar("IBM", "2022-01-05", 102.0),
                make_bar("IBM", "2022-01-03", 100.0),
                make_bar("CSCO", "2022-01-04", 50.0),
                make_bar("CSCO", "2022-01-03", 49.0),
                make_bar("IBM", "2021-12-31", 99.0),
            ],
            d("2022-01-01"),
            d("2022-01-31"),
        )
    }

    #[test]
    fn series_sorted_and_filtered_to_range() {
        let md = sample();
        let ibm = md.get_price_series("IBM").unwrap();
        assert_eq!(ibm.len(), 2);
        assert_eq!(ibm[0].date, d("2022-01-03"));
        assert_eq!(ibm[1].date, d("2022-01-05"));
    }

    #[test]
    fn unified_timeline_merges_and_sorts() {
        let md = sample();
        assert_eq!(
            md.trading_dates(),
            &[d("2022-01-03"), d("2022-01-04"), d("2022-01-05")]
        );
    }

    #[test]
    fn get_price_exact_date() {
        let md = sample();
        assert_eq!(md.get_price("CSCO", d("2022-01-04")).unwrap(), 50.0);
    }

    #[test]
    fn get_price_missing_date_is_price_not_found() {
        let md = sample();
        let err = md.get_price("CSCO", d("2022-01-05")).unwrap_err();
        assert!(matches!(err, EodError::PriceNotFound { symbol, .. } if symbol == "CSCO"));
    }

    #[test]
    fn unknown_symbol_series_is_no_data() {
        let md = sample();
        assert!(matches!(
            md.get_price_series("NOK"),
            Err(EodError::NoData { .. })
        ));
    }

    #[test]
    fn duplicate_dates_keep_last_close() {
        let md = MarketData::from_bars(
            vec![
                make_bar("IBM", "2022-01-03", 100.0),
                make_bar("IBM", "2022-01-03", 101.0),
            ],
            d("2022-01-01"),
            d("2022-01-31"),
        );
        assert_eq!(md.bar_count("IBM"), 1);
        assert_eq!(md.get_price("IBM", d("2022-01-03")).unwrap(), 101.0);
    }

    #[test]
    fn name_lists_symbols() {
        let md = sample();
        assert_eq!(
            md.to_string(),
            "MarketData - 2022-01-01 - 2022-01-31 - CSCO,IBM"
        );
    }
}
