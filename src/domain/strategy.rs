//! Strategy composition: a signal function plus an allocation rule.

use crate::domain::allocation::Allocation;
use crate::domain::signal::{AlwaysBuy, Momentum, SignalFn};

pub const DEFAULT_LOOKBACK: usize = 10;
pub const DEFAULT_MIN_CASH: f64 = 10_000.0;
pub const DEFAULT_CASH_FRACTION: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct Strategy<S> {
    pub name: String,
    pub signal: S,
    pub allocation: Allocation,
}

impl<S: SignalFn> Strategy<S> {
    pub fn new(name: impl Into<String>, signal: S, allocation: Allocation) -> Self {
        Strategy {
            name: name.into(),
            signal,
            allocation,
        }
    }
}

/// Parameters of the momentum strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct MomentumParams {
    pub lookback: usize,
    pub min_cash: f64,
    pub cash_fraction: f64,
}

impl Default for MomentumParams {
    fn default() -> Self {
        MomentumParams {
            lookback: DEFAULT_LOOKBACK,
            min_cash: DEFAULT_MIN_CASH,
            cash_fraction: DEFAULT_CASH_FRACTION,
        }
    }
}

/// Buy every symbol once with an equal share of the starting cash, then hold.
pub fn buy_and_hold_equal_allocation() -> Strategy<AlwaysBuy> {
    Strategy::new(
        "BuyAndHoldEqualAllocation",
        AlwaysBuy,
        Allocation::EqualSplitOnce,
    )
}

/// Buy a cash fraction while the price is above its level `lookback` days
/// ago, liquidate otherwise.
pub fn buy_on_the_up_sell_on_the_down(params: &MomentumParams) -> Strategy<Momentum> {
    Strategy::new(
        "BuyOnTheUpSellOnTheDown",
        Momentum {
            lookback: params.lookback,
        },
        Allocation::CashFraction {
            fraction: params.cash_fraction,
            min_cash: params.min_cash,
        },
    )
}

/// Named strategies selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    EqualAllocation,
    Momentum,
}

impl StrategyKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "equal_allocation" | "buy_and_hold" => Some(StrategyKind::EqualAllocation),
            "momentum" | "buy_on_the_up" => Some(StrategyKind::Momentum),
            _ => None,
        }
    }
}
