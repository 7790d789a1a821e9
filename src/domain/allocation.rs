//! Order sizing for buy signals.
//!
//! Quantities are whole shares, floored. A result of zero means "skip".

/// How a buy signal is turned into a share count.
#[derive(Debug, Clone, PartialEq)]
pub enum Allocation {
    /// Split the cash available at the start of the first fully-priced date
    /// equally across all symbols, once.
    EqualSplitOnce,
    /// Spend `fraction` of current cash per buy, only while cash exceeds
    /// `min_cash`.
    CashFraction { fraction: f64, min_cash: f64 },
}

/// floor(budget / price); zero for unusable prices.
pub fn equal_split_quantity(budget: f64, price: f64) -> i64 {
    whole_shares(budget, price)
}

/// floor(cash * fraction / price) when cash > min_cash, else zero.
pub fn cash_fraction_quantity(cash: f64, price: f64, fraction: f64, min_cash: f64) -> i64 {
    if cash <= min_cash {
        return 0;
    }
    whole_shares(cash * fraction, price)
}

fn whole_shares(budget: f64, price: f64) -> i64 {
    if price.is_nan() || budget.is_nan() || price <= 0.0 || budget <= 0.0 {
        return 0;
    }
    (budget / price).floor() as i64
}
