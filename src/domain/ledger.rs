//! Portfolio ledger: cash, share counts, trade log and cash history.
//!
//! Holdings and cash change only through [`Ledger::buy`] and [`Ledger::sell`].
//! Every change appends a [`TradeAction`] and snapshots cash at the trade
//! date, so any as-of query can be answered by replaying the log. Trades are
//! appended in date order; a trade dated before the last logged one is
//! rejected.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::domain::error::EodError;
use crate::domain::trade::{Side, TradeAction};
use crate::ports::price_port::PricePort;

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    initial_capital: f64,
    cash: f64,
    holdings: BTreeMap<String, i64>,
    trades: Vec<TradeAction>,
    cash_history: BTreeMap<NaiveDate, f64>,
}

impl Ledger {
    pub fn new(initial_capital: f64) -> Self {
        Ledger {
            initial_capital,
            cash: initial_capital,
            holdings: BTreeMap::new(),
            trades: Vec::new(),
            cash_history: BTreeMap::new(),
        }
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn holdings(&self) -> &BTreeMap<String, i64> {
        &self.holdings
    }

    /// Current share count for `symbol` (0 if never traded).
    pub fn position(&self, symbol: &str) -> i64 {
        self.holdings.get(symbol).copied().unwrap_or(0)
    }

    pub fn trades(&self) -> &[TradeAction] {
        &self.trades
    }

    pub fn cash_history(&self) -> &BTreeMap<NaiveDate, f64> {
        &self.cash_history
    }

    /// Buy `quantity` shares of `symbol` at its close on `date`.
    ///
    /// Fails without touching the ledger if the quantity is not positive,
    /// `date` precedes the last logged trade, or the price is unavailable.
    pub fn buy(
        &mut self,
        prices: &dyn PricePort,
        symbol: &str,
        date: NaiveDate,
        quantity: i64,
    ) -> Result<TradeAction, EodError> {
        if quantity <= 0 {
            return Err(EodError::InvalidQuantity {
                symbol: symbol.to_string(),
                quantity,
            });
        }
        self.check_order(symbol, date)?;
        let price = lookup_trade_price(prices, symbol, date)?;
        Ok(self.apply(symbol, date, Side::Buy, quantity, price))
    }

    /// Sell up to `quantity` shares of `symbol` at its close on `date`.
    ///
    /// With no long position this is a no-op returning `Ok(None)`. The
    /// quantity is capped at the shares held.
    pub fn sell(
        &mut self,
        prices: &dyn PricePort,
        symbol: &str,
        date: NaiveDate,
        quantity: i64,
    ) -> Result<Option<TradeAction>, EodError> {
        let held = self.position(symbol);
        if held <= 0 || quantity <= 0 {
            return Ok(None);
        }
        let quantity = quantity.min(held);
        self.check_order(symbol, date)?;
        let price = lookup_trade_price(prices, symbol, date)?;
        Ok(Some(self.apply(symbol, date, Side::Sell, quantity, price)))
    }

    fn check_order(&self, symbol: &str, date: NaiveDate) -> Result<(), EodError> {
        match self.trades.last() {
            Some(last) if date < last.date => Err(EodError::OutOfOrderTrade {
                symbol: symbol.to_string(),
                date,
                last: last.date,
            }),
            _ => Ok(()),
        }
    }

    fn apply(
        &mut self,
        symbol: &str,
        date: NaiveDate,
        side: Side,
        quantity: i64,
        price: f64,
    ) -> TradeAction {
        let trade = TradeAction {
            symbol: symbol.to_string(),
            date,
            side,
            quantity,
            price,
        };

        *self.holdings.entry(symbol.to_string()).or_insert(0) += trade.signed_quantity();
        match side {
            Side::Buy => self.cash -= trade.value(),
            Side::Sell => self.cash += trade.value(),
        }
        self.cash_history.insert(date, self.cash);

        tracing::debug!(%trade, cash = self.cash, "trade applied");
        self.trades.push(trade.clone());
        trade
    }

    /// Share counts implied by all trades dated on or before `date`.
    pub fn holdings_as_of(&self, date: NaiveDate) -> BTreeMap<String, i64> {
        let mut holdings = BTreeMap::new();
        for trade in self.trades.iter().filter(|t| t.date <= date) {
            *holdings.entry(trade.symbol.clone()).or_insert(0) += trade.signed_quantity();
        }
        holdings
    }

    /// Latest cash snapshot on or before `date`, else the initial capital.
    pub fn cash_as_of(&self, date: NaiveDate) -> f64 {
        self.cash_history
            .range(..=date)
            .next_back()
            .map(|(_, &cash)| cash)
            .unwrap_or(self.initial_capital)
    }

    /// Market value of each non-zero position held as of `date`.
    pub fn value_breakdown_as_of(
        &self,
        date: NaiveDate,
        prices: &dyn PricePort,
    ) -> Result<BTreeMap<String, f64>, EodError> {
        let mut breakdown = BTreeMap::new();
        for (symbol, quantity) in self.holdings_as_of(date) {
            if quantity == 0 {
                continue;
            }
            let price = prices.get_price(&symbol, date)?;
            breakdown.insert(symbol, quantity as f64 * price);
        }
        Ok(breakdown)
    }

    /// Positions at market plus cash, as of `date`.
    pub fn gross_value_as_of(
        &self,
        date: NaiveDate,
        prices: &dyn PricePort,
    ) -> Result<f64, EodError> {
        let positions: f64 = self.value_breakdown_as_of(date, prices)?.values().sum();
        Ok(positions + self.cash_as_of(date))
    }
}

fn lookup_trade_price(
    prices: &dyn PricePort,
    symbol: &str,
    date: NaiveDate,
) -> Result<f64, EodError> {
    prices
        .get_price(symbol, date)
        .map_err(|_| EodError::PriceUnavailable {
            symbol: symbol.to_string(),
            date,
        })
}
