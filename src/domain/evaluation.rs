//! Valuation of a finished run: point-in-time report and gross value series.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::EodError;
use crate::ports::price_port::PricePort;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Portfolio valuation at one date.
///
/// Two historical profit conventions disagree on the sign applied to cash, so
/// both are reported next to the unambiguous `net_profit`.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub strategy_name: String,
    pub date: NaiveDate,
    pub initial_capital: f64,
    pub cash: f64,
    pub holdings_value: f64,
    pub gross_value: f64,
    /// gross_value - initial_capital
    pub net_profit: f64,
    /// holdings_value - initial_capital + cash
    pub net_profit_plus_cash: f64,
    /// holdings_value - initial_capital - cash
    pub net_profit_minus_cash: f64,
    pub breakdown: BTreeMap<String, f64>,
}

pub fn evaluate(
    result: &BacktestResult,
    prices: &dyn PricePort,
    date: NaiveDate,
) -> Result<Evaluation, EodError> {
    let ledger = &result.ledger;
    let breakdown = ledger.value_breakdown_as_of(date, prices)?;
    let holdings_value: f64 = breakdown.values().sum();
    let cash = ledger.cash_as_of(date);
    let initial_capital = ledger.initial_capital();
    let gross_value = holdings_value + cash;

    Ok(Evaluation {
        strategy_name: result.strategy_name.clone(),
        date,
        initial_capital,
        cash,
        holdings_value,
        gross_value,
        net_profit: gross_value - initial_capital,
        net_profit_plus_cash: holdings_value - initial_capital + cash,
        net_profit_minus_cash: holdings_value - initial_capital - cash,
        breakdown,
    })
}

/// Gross value (positions plus cash) on every trading date of the run.
pub fn plot_series(
    result: &BacktestResult,
    prices: &dyn PricePort,
) -> Result<Vec<EquityPoint>, EodError> {
    result
        .trading_dates
        .iter()
        .map(|&date| {
            Ok(EquityPoint {
                date,
                equity: result.ledger.gross_value_as_of(date, prices)?,
            })
        })
        .collect()
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} ===", self.strategy_name)?;
        writeln!(f, "Initial investment:        {:.2}", self.initial_capital)?;
        writeln!(
            f,
            "Portfolio gross value at {}: {:.2}",
            self.date, self.gross_value
        )?;
        writeln!(f, "  Holdings value:          {:.2}", self.holdings_value)?;
        writeln!(f, "  Cash:                    {:.2}", self.cash)?;
        writeln!(f, "Total net profit:          {:.2}", self.net_profit)?;
        writeln!(f, "  holdings - initial + cash: {:.2}", self.net_profit_plus_cash)?;
        writeln!(f, "  holdings - initial - cash: {:.2}", self.net_profit_minus_cash)?;
        if self.breakdown.is_empty() {
            write!(f, "Fractional contributions:  none")
        } else {
            write!(f, "Fractional contributions:")?;
            for (symbol, value) in &self.breakdown {
                write!(f, "\n  {symbol}: {value:.2}")?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::{run_backtest, BacktestConfig};
    use crate::domain::eod_bar::EodBar;
    use crate::domain::market_data::MarketData;
    use crate::domain::strategy::buy_and_hold_equal_allocation;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 2, day).unwrap()
    }

    fn bar(symbol: &str, day: u32, close: f64) -> EodBar {
        EodBar {
            symbol: symbol.to_string(),
            exchange: String::new(),
            date: d(day),
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }

    fn run() -> (MarketData, BacktestResult) {
        let md = MarketData::from_bars(
            vec![
                bar("IBM", 1, 100.0),
                bar("CSCO", 1, 40.0),
                bar("IBM", 2, 120.0),
                bar("CSCO", 2, 30.0),
            ],
            d(1),
            d(28),
        );
        let config = BacktestConfig {
            symbols: vec!["IBM".into(), "CSCO".into()],
            initial_capital: 1_000.0,
            start_date: d(1),
            end_date: d(28),
        };
        let result = run_backtest(&md, &config, &mut buy_and_hold_equal_allocation()).unwrap();
        (md, result)
    }

    #[test]
    fn evaluate_reports_both_profit_conventions() {
        let (md, result) = run();
        // 5 IBM (500) + 12 CSCO (480), cash 20.
        let eval = evaluate(&result, &md, d(2)).unwrap();
        assert!((eval.holdings_value - (600.0 + 360.0)).abs() < 1e-9);
        assert!((eval.cash - 20.0).abs() < 1e-9);
        assert!((eval.gross_value - 980.0).abs() < 1e-9);
        assert!((eval.net_profit - (-20.0)).abs() < 1e-9);
        assert!((eval.net_profit_plus_cash - (-20.0)).abs() < 1e-9);
        assert!((eval.net_profit_minus_cash - (-60.0)).abs() < 1e-9);
        assert_eq!(eval.breakdown.len(), 2);
    }

    #[test]
    fn evaluate_on_unpriced_date_fails() {
        let (md, result) = run();
        assert!(matches!(
            evaluate(&result, &md, d(3)),
            Err(EodError::PriceNotFound { .. })
        ));
    }

    #[test]
    fn plot_series_covers_each_trading_date() {
        let (md, result) = run();
        let series = plot_series(&result, &md).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, d(1));
        assert!((series[0].equity - 1_000.0).abs() < 1e-9);
        assert!((series[1].equity - 980.0).abs() < 1e-9);
    }

    #[test]
    fn display_lists_contributions() {
        let (md, result) = run();
        let text = evaluate(&result, &md, d(2)).unwrap().to_string();
        assert!(text.contains("BuyAndHoldEqualAllocation"));
        assert!(text.contains("Initial investment:"));
        assert!(text.contains("IBM: 600.00"));
        assert!(text.contains("CSCO: 360.00"));
    }
}
