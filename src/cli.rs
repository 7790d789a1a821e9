//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::chart_svg::SvgChartAdapter;
use crate::adapters::csv_adapter::CsvEodAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_cache::{JsonCache, DEFAULT_CACHE_DIR, DEFAULT_MAX_ENTRIES};
use crate::adapters::marketstack_adapter::MarketstackAdapter;
use crate::adapters::provider::MarketDataProvider;
use crate::adapters::series_csv::CsvSeriesAdapter;
use crate::domain::backtest::{
    run_backtest, BacktestConfig, BacktestResult, DEFAULT_INITIAL_CAPITAL,
};
use crate::domain::config_validation::{parse_date, validate_config};
use crate::domain::error::EodError;
use crate::domain::evaluation::{evaluate, plot_series, Evaluation};
use crate::domain::market_data::MarketData;
use crate::domain::query::EodQuery;
use crate::domain::strategy::{
    buy_and_hold_equal_allocation, buy_on_the_up_sell_on_the_down, MomentumParams, StrategyKind,
    DEFAULT_CASH_FRACTION, DEFAULT_LOOKBACK, DEFAULT_MIN_CASH,
};
use crate::domain::universe::parse_symbols;
use crate::obs::init_tracing;
use crate::ports::config_port::ConfigPort;
use crate::ports::eod_port::EodPort;
use crate::ports::price_port::PricePort;
use crate::ports::report_port::{NamedSeries, ReportPort};

#[derive(Parser, Debug)]
#[command(name = "eodtrader", about = "End-of-day stock strategy backtester")]
pub struct Cli {
    /// Log filter, overrides [logging] level
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the configured strategies and report their valuation
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated symbols, overrides [backtest] symbols
        #[arg(long)]
        symbols: Option<String>,
        /// Re-fetch from the source even if cached
        #[arg(long)]
        refresh: bool,
        /// Print every trade
        #[arg(long)]
        trades: bool,
    },
    /// Fetch and cache the configured market data
    Fetch {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbols: Option<String>,
        #[arg(long)]
        refresh: bool,
    },
    /// Show the most recent end-of-day bar per symbol
    Latest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbols: Option<String>,
    },
    /// Inspect or clear the market data cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// List cached queries
    List {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Remove every cached query
    Clear {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let log_level = cli.log_level.as_deref();
    match cli.command {
        Command::Backtest {
            config,
            symbols,
            refresh,
            trades,
        } => run_backtest_command(&config, symbols.as_deref(), refresh, trades, log_level),
        Command::Fetch {
            config,
            symbols,
            refresh,
        } => run_fetch(&config, symbols.as_deref(), refresh, log_level),
        Command::Latest { config, symbols } => run_latest(&config, symbols.as_deref(), log_level),
        Command::Cache { command } => match command {
            CacheCommand::List { config } => run_cache_list(&config, log_level),
            CacheCommand::Clear { config } => run_cache_clear(&config, log_level),
        },
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Load the config file, install logging and validate every section.
fn prepare(config_path: &Path, log_level: Option<&str>) -> Result<FileConfigAdapter, ExitCode> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    setup_logging(&adapter, log_level)?;
    if let Err(e) = validate_config(&adapter) {
        eprintln!("error: {e}");
        return Err((&e).into());
    }
    Ok(adapter)
}

fn setup_logging(config: &dyn ConfigPort, log_level: Option<&str>) -> Result<(), ExitCode> {
    let level = log_level
        .map(str::to_string)
        .or_else(|| config.get_string("logging", "level"))
        .unwrap_or_else(|| "warn".to_string());
    let format = config
        .get_string("logging", "format")
        .unwrap_or_else(|| "text".to_string());
    init_tracing(&level, &format).map_err(|reason| {
        let err = EodError::ConfigInvalid {
            section: "logging".into(),
            key: "level".into(),
            reason,
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Everything a backtest run needs, resolved from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestPlan {
    pub config: BacktestConfig,
    pub strategies: Vec<StrategyKind>,
    pub momentum: MomentumParams,
    pub evaluate_date: Option<NaiveDate>,
    pub series_csv: Option<PathBuf>,
    pub chart_svg: Option<PathBuf>,
}

impl BacktestPlan {
    pub fn query(&self) -> EodQuery {
        EodQuery::new(
            self.config.symbols.clone(),
            self.config.start_date,
            self.config.end_date,
        )
    }
}

pub fn build_backtest_config(
    adapter: &dyn ConfigPort,
    symbols_override: Option<&str>,
) -> Result<BacktestConfig, EodError> {
    let symbols = resolve_symbols(symbols_override, adapter)?;
    let start_str = adapter.get_string("backtest", "start_date");
    let end_str = adapter.get_string("backtest", "end_date");
    let start_date = parse_date(start_str.as_deref(), "backtest", "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "backtest", "end_date")?;

    Ok(BacktestConfig {
        symbols,
        initial_capital: adapter.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL),
        start_date,
        end_date,
    })
}

pub fn build_momentum_params(adapter: &dyn ConfigPort) -> MomentumParams {
    MomentumParams {
        lookback: adapter
            .get_int("momentum", "lookback", DEFAULT_LOOKBACK as i64)
            .max(1) as usize,
        min_cash: adapter.get_double("momentum", "min_cash", DEFAULT_MIN_CASH),
        cash_fraction: adapter.get_double("momentum", "cash_fraction", DEFAULT_CASH_FRACTION),
    }
}

/// Configured strategies in order; both when none are named.
pub fn resolve_strategies(adapter: &dyn ConfigPort) -> Result<Vec<StrategyKind>, EodError> {
    let names = adapter.get_list("backtest", "strategies");
    if names.is_empty() {
        return Ok(vec![StrategyKind::EqualAllocation, StrategyKind::Momentum]);
    }
    let mut kinds = Vec::with_capacity(names.len());
    for name in names {
        let kind = StrategyKind::parse(&name).ok_or_else(|| EodError::ConfigInvalid {
            section: "backtest".into(),
            key: "strategies".into(),
            reason: format!("unknown strategy '{name}'"),
        })?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

pub fn resolve_symbols(
    symbols_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, EodError> {
    match symbols_override {
        Some(s) => Ok(parse_symbols(s)?),
        None => {
            let raw = config
                .get_string("backtest", "symbols")
                .ok_or_else(|| EodError::ConfigMissing {
                    section: "backtest".into(),
                    key: "symbols".into(),
                })?;
            Ok(parse_symbols(&raw)?)
        }
    }
}

pub fn build_plan(
    adapter: &dyn ConfigPort,
    symbols_override: Option<&str>,
) -> Result<BacktestPlan, EodError> {
    let config = build_backtest_config(adapter, symbols_override)?;
    let evaluate_date = match adapter.get_string("backtest", "evaluate_date") {
        Some(raw) => Some(parse_date(Some(&raw), "backtest", "evaluate_date")?),
        None => None,
    };
    Ok(BacktestPlan {
        config,
        strategies: resolve_strategies(adapter)?,
        momentum: build_momentum_params(adapter),
        evaluate_date,
        series_csv: adapter.get_string("report", "series_csv").map(PathBuf::from),
        chart_svg: adapter.get_string("report", "chart_svg").map(PathBuf::from),
    })
}

/// Raw source selected by `[data] source`.
pub fn build_source(adapter: &dyn ConfigPort) -> Result<Box<dyn EodPort>, EodError> {
    let source = adapter
        .get_string("data", "source")
        .unwrap_or_else(|| "marketstack".to_string());
    match source.trim().to_lowercase().as_str() {
        "csv" => {
            let dir = adapter
                .get_string("data", "csv_dir")
                .ok_or_else(|| EodError::ConfigMissing {
                    section: "data".into(),
                    key: "csv_dir".into(),
                })?;
            Ok(Box::new(CsvEodAdapter::new(PathBuf::from(dir))))
        }
        "marketstack" => Ok(Box::new(MarketstackAdapter::from_config(adapter)?)),
        other => Err(EodError::ConfigInvalid {
            section: "data".into(),
            key: "source".into(),
            reason: format!("unknown source '{other}'"),
        }),
    }
}

pub fn build_cache(adapter: &dyn ConfigPort) -> JsonCache {
    let dir = adapter
        .get_string("data", "cache_dir")
        .unwrap_or_else(|| DEFAULT_CACHE_DIR.to_string());
    let max_entries = adapter.get_int("data", "cache_max_entries", DEFAULT_MAX_ENTRIES as i64);
    JsonCache::new(dir, max_entries.max(1) as usize)
}

pub fn run_strategy(
    prices: &MarketData,
    config: &BacktestConfig,
    kind: StrategyKind,
    momentum: &MomentumParams,
) -> Result<BacktestResult, EodError> {
    match kind {
        StrategyKind::EqualAllocation => {
            run_backtest(prices, config, &mut buy_and_hold_equal_allocation())
        }
        StrategyKind::Momentum => {
            run_backtest(prices, config, &mut buy_on_the_up_sell_on_the_down(momentum))
        }
    }
}

/// Output of a complete backtest run.
#[derive(Debug)]
pub struct PipelineOutput {
    pub market_data: MarketData,
    pub results: Vec<BacktestResult>,
    pub evaluations: Vec<Evaluation>,
    pub series: Vec<NamedSeries>,
}

/// Load data, run every planned strategy, value each run and write any
/// configured reports.
pub fn run_backtest_pipeline<S: EodPort>(
    provider: &mut MarketDataProvider<S>,
    plan: &BacktestPlan,
    refresh: bool,
) -> Result<PipelineOutput, EodError> {
    let query = plan.query();
    let market_data = if refresh {
        provider.refresh(&query)?
    } else {
        provider.load(&query)?
    };
    eprintln!("Loaded {}", market_data.name());

    let mut results = Vec::with_capacity(plan.strategies.len());
    let mut evaluations = Vec::with_capacity(plan.strategies.len());
    let mut series = Vec::with_capacity(plan.strategies.len());

    for &kind in &plan.strategies {
        let result = run_strategy(&market_data, &plan.config, kind, &plan.momentum)?;
        let date = evaluation_date(plan, &result)?;
        evaluations.push(evaluate(&result, &market_data, date)?);
        series.push(NamedSeries {
            name: result.strategy_name.clone(),
            points: plot_series(&result, &market_data)?,
        });
        results.push(result);
    }

    if let Some(path) = &plan.series_csv {
        CsvSeriesAdapter::new().write(&series, path)?;
        eprintln!("Series written to {}", path.display());
    }
    if let Some(path) = &plan.chart_svg {
        SvgChartAdapter::new().write(&series, path)?;
        eprintln!("Chart written to {}", path.display());
    }

    Ok(PipelineOutput {
        market_data,
        results,
        evaluations,
        series,
    })
}

/// Configured evaluation date, else the last trading date of the run.
fn evaluation_date(plan: &BacktestPlan, result: &BacktestResult) -> Result<NaiveDate, EodError> {
    if let Some(date) = plan.evaluate_date {
        return Ok(date);
    }
    result
        .trading_dates
        .last()
        .copied()
        .ok_or_else(|| EodError::NoData {
            symbol: result.symbols.join(","),
        })
}

fn run_backtest_command(
    config_path: &Path,
    symbols_override: Option<&str>,
    refresh: bool,
    print_trades: bool,
    log_level: Option<&str>,
) -> ExitCode {
    let adapter = match prepare(config_path, log_level) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let plan = match build_plan(&adapter, symbols_override) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let source = match build_source(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let mut provider = MarketDataProvider::new(source, Some(build_cache(&adapter)));

    eprintln!(
        "Running {} strategies over {} symbols...",
        plan.strategies.len(),
        plan.config.symbols.len()
    );
    let output = match run_backtest_pipeline(&mut provider, &plan, refresh) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    for (result, evaluation) in output.results.iter().zip(&output.evaluations) {
        if print_trades {
            for trade in result.ledger.trades() {
                println!("{trade}");
            }
        }
        println!("{evaluation}");
        println!("Trades: {}", result.ledger.trades().len());
        println!();
    }
    ExitCode::SUCCESS
}

fn run_fetch(
    config_path: &Path,
    symbols_override: Option<&str>,
    refresh: bool,
    log_level: Option<&str>,
) -> ExitCode {
    let adapter = match prepare(config_path, log_level) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let result = fetch_market_data(&adapter, symbols_override, refresh);

    match result {
        Ok(data) => {
            println!("{}", data.name());
            for symbol in data.symbols() {
                println!("  {}: {} bars", symbol, data.bar_count(&symbol));
            }
            println!("  trading dates: {}", data.trading_dates().len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn fetch_market_data(
    adapter: &dyn ConfigPort,
    symbols_override: Option<&str>,
    refresh: bool,
) -> Result<MarketData, EodError> {
    let config = build_backtest_config(adapter, symbols_override)?;
    let query = EodQuery::new(config.symbols, config.start_date, config.end_date);
    let mut provider = MarketDataProvider::new(build_source(adapter)?, Some(build_cache(adapter)));
    if refresh {
        provider.refresh(&query)
    } else {
        provider.load(&query)
    }
}

fn run_latest(
    config_path: &Path,
    symbols_override: Option<&str>,
    log_level: Option<&str>,
) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(code) = setup_logging(&adapter, log_level) {
        return code;
    }

    let result = resolve_symbols(symbols_override, &adapter).and_then(|symbols| {
        let provider = MarketDataProvider::new(build_source(&adapter)?, None);
        provider.latest(&symbols)
    });

    match result {
        Ok(bars) if bars.is_empty() => {
            eprintln!("No data returned");
            ExitCode::SUCCESS
        }
        Ok(bars) => {
            for bar in &bars {
                println!("{} {} close {:.2}", bar.symbol, bar.date, bar.close);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_cache_list(config_path: &Path, log_level: Option<&str>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(code) = setup_logging(&adapter, log_level) {
        return code;
    }

    let cache = build_cache(&adapter);
    match cache.entries() {
        Ok(entries) if entries.is_empty() => {
            eprintln!("Cache at {} is empty", cache.cache_dir().display());
            ExitCode::SUCCESS
        }
        Ok(entries) => {
            for entry in &entries {
                println!(
                    "{} {} {}..{} {} bars from {} at {}",
                    entry.key,
                    entry.symbols.join(","),
                    entry.start_date,
                    entry.end_date,
                    entry.bar_count,
                    entry.source,
                    entry.fetched_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
            eprintln!("{} entries", entries.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_cache_clear(config_path: &Path, log_level: Option<&str>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(code) = setup_logging(&adapter, log_level) {
        return code;
    }

    match build_cache(&adapter).clear() {
        Ok(removed) => {
            eprintln!("Removed {removed} cache entries");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let plan = match build_plan(&adapter, None) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("\nBacktest:");
    eprintln!("  symbols: {}", plan.config.symbols.join(", "));
    eprintln!("  range: {} to {}", plan.config.start_date, plan.config.end_date);
    eprintln!("  initial capital: {:.2}", plan.config.initial_capital);
    eprintln!("  strategies: {:?}", plan.strategies);
    eprintln!(
        "  momentum: lookback {}, min cash {:.2}, cash fraction {}",
        plan.momentum.lookback, plan.momentum.min_cash, plan.momentum.cash_fraction
    );

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
