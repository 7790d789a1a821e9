//! Backtest engine: the day-by-day simulation loop.
//!
//! For each trading date in ascending order, and for each tradable symbol in
//! configured order, the strategy's signal function is evaluated over the
//! symbol's visible history and the resulting order is applied to the ledger
//! before moving on. Later decisions depend on cash and holdings changed by
//! earlier ones, so the loop is strictly sequential.

use chrono::NaiveDate;

use crate::domain::allocation::{cash_fraction_quantity, equal_split_quantity, Allocation};
use crate::domain::eod_bar::{visible_history, PricePoint};
use crate::domain::error::EodError;
use crate::domain::ledger::Ledger;
use crate::domain::signal::{Signal, SignalFn};
use crate::domain::strategy::Strategy;
use crate::domain::universe::resolve_tradable;
use crate::ports::price_port::PricePort;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 1_000_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub symbols: Vec<String>,
    pub initial_capital: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl BacktestConfig {
    pub fn new(symbols: Vec<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        BacktestConfig {
            symbols,
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            start_date,
            end_date,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub strategy_name: String,
    pub config: BacktestConfig,
    pub symbols: Vec<String>,
    pub trading_dates: Vec<NaiveDate>,
    pub ledger: Ledger,
}

/// Run `strategy` over `prices` and return the final ledger.
///
/// Fails on the first missing price a trade needs; there is no partial result.
pub fn run_backtest<S: SignalFn>(
    prices: &dyn PricePort,
    config: &BacktestConfig,
    strategy: &mut Strategy<S>,
) -> Result<BacktestResult, EodError> {
    let symbols = resolve_tradable(prices, &config.symbols)?;
    let trading_dates: Vec<NaiveDate> = prices
        .trading_dates()
        .iter()
        .copied()
        .filter(|d| *d >= config.start_date && *d <= config.end_date)
        .collect();

    tracing::info!(
        strategy = %strategy.name,
        symbols = symbols.len(),
        dates = trading_dates.len(),
        "running backtest"
    );

    let mut series: Vec<(&str, &[PricePoint])> = Vec::with_capacity(symbols.len());
    for symbol in &symbols {
        series.push((symbol.as_str(), prices.get_price_series(symbol)?));
    }

    let mut ledger = Ledger::new(config.initial_capital);
    let mut allocated = false;

    for &date in &trading_dates {
        let equal_budget = match strategy.allocation {
            Allocation::EqualSplitOnce if !allocated => {
                let all_priced = series.iter().all(|(_, s)| priced_on(s, date));
                all_priced.then(|| ledger.cash() / symbols.len() as f64)
            }
            _ => None,
        };

        for &(symbol, points) in &series {
            let history = visible_history(points, date);
            let Some(current) = history.last().filter(|p| p.date == date) else {
                continue;
            };

            match strategy.signal.signal(history) {
                Signal::NoSignal => {}
                Signal::Buy => {
                    let quantity = match strategy.allocation {
                        Allocation::EqualSplitOnce => equal_budget
                            .map(|budget| equal_split_quantity(budget, current.close))
                            .unwrap_or(0),
                        Allocation::CashFraction { fraction, min_cash } => {
                            cash_fraction_quantity(ledger.cash(), current.close, fraction, min_cash)
                        }
                    };
                    if quantity > 0 {
                        ledger.buy(prices, symbol, date, quantity)?;
                    }
                }
                Signal::Sell => {
                    let held = ledger.position(symbol);
                    ledger.sell(prices, symbol, date, held)?;
                }
            }
        }

        if equal_budget.is_some() {
            allocated = true;
        }
    }

    tracing::info!(
        strategy = %strategy.name,
        trades = ledger.trades().len(),
        cash = ledger.cash(),
        "backtest complete"
    );

    Ok(BacktestResult {
        strategy_name: strategy.name.clone(),
        config: config.clone(),
        symbols,
        trading_dates,
        ledger,
    })
}

fn priced_on(points: &[PricePoint], date: NaiveDate) -> bool {
    points.binary_search_by_key(&date, |p| p.date).is_ok()
}
