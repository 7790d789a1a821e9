//! Signal functions: buy/sell/none decisions from a visible price history.
//!
//! A signal function only ever sees prices dated on or before the date being
//! simulated; the last point of the slice is the current close.

use crate::domain::eod_bar::PricePoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    NoSignal,
    Buy,
    Sell,
}

pub trait SignalFn {
    fn signal(&mut self, history: &[PricePoint]) -> Signal;
}

impl<F> SignalFn for F
where
    F: FnMut(&[PricePoint]) -> Signal,
{
    fn signal(&mut self, history: &[PricePoint]) -> Signal {
        self(history)
    }
}

/// Buy whenever a price is available. Paired with a one-shot allocation this
/// is buy-and-hold.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysBuy;

impl SignalFn for AlwaysBuy {
    fn signal(&mut self, history: &[PricePoint]) -> Signal {
        if history.is_empty() {
            Signal::NoSignal
        } else {
            Signal::Buy
        }
    }
}

/// Compare the current close with the close `lookback` trading days earlier:
/// rising buys, anything else sells.
#[derive(Debug, Clone, Copy)]
pub struct Momentum {
    pub lookback: usize,
}

impl SignalFn for Momentum {
    fn signal(&mut self, history: &[PricePoint]) -> Signal {
        if self.lookback == 0 || history.len() <= self.lookback {
            return Signal::NoSignal;
        }
        let current = history[history.len() - 1].close;
        let past = history[history.len() - 1 - self.lookback].close;
        if current > past {
            Signal::Buy
        } else {
            Signal::Sell
        }
    }
}
