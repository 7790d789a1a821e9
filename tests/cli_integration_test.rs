//! CLI integration tests for configuration handling and command orchestration.
//!
//! Tests cover:
//! - Config parsing (build_backtest_config, build_momentum_params, build_plan)
//! - Symbol and strategy resolution
//! - Source and cache construction from INI files on disk
//! - Full pipeline over the offline CSV source

mod common;

use approx::assert_relative_eq;
use common::*;
use eodtrader::adapters::file_config_adapter::FileConfigAdapter;
use eodtrader::adapters::provider::MarketDataProvider;
use eodtrader::cli;
use eodtrader::domain::config_validation::{validate_config, validate_momentum_config};
use eodtrader::domain::error::EodError;
use eodtrader::domain::strategy::{MomentumParams, StrategyKind, DEFAULT_MIN_CASH};
use eodtrader::domain::universe::UniverseError;
use eodtrader::ports::eod_port::EodPort;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const VALID_INI: &str = r#"
[backtest]
symbols = CSCO, IBM
start_date = 2018-01-01
end_date = 2022-03-01
initial_capital = 1000000
strategies = equal_allocation, momentum

[momentum]
lookback = 10
min_cash = 10000
cash_fraction = 0.1

[data]
source = marketstack
api_key = test-key
cache_dir = /tmp/eodtrader-test-cache
cache_max_entries = 8

[report]
series_csv = out/series.csv
chart_svg = out/comparison.svg

[logging]
level = info
format = text
"#;

mod config_loading {
    use super::*;

    #[test]
    fn load_config_from_file() {
        let file = write_temp_ini(VALID_INI);
        let adapter = cli::load_config(file.path()).unwrap();
        assert!(validate_config(&adapter).is_ok());
    }

    #[test]
    fn load_config_missing_file_fails() {
        assert!(cli::load_config(&PathBuf::from("/nonexistent/eodtrader.ini")).is_err());
    }

    #[test]
    fn build_backtest_config_reads_all_fields() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let config = cli::build_backtest_config(&adapter, None).unwrap();
        assert_eq!(config.symbols, vec!["CSCO", "IBM"]);
        assert_eq!(config.start_date, date("2018-01-01"));
        assert_eq!(config.end_date, date("2022-03-01"));
        assert_eq!(config.initial_capital, 1_000_000.0);
    }

    #[test]
    fn build_backtest_config_default_capital() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\nsymbols = IBM\nstart_date = 2022-01-01\nend_date = 2022-02-01\n",
        )
        .unwrap();
        let config = cli::build_backtest_config(&adapter, None).unwrap();
        assert_eq!(config.initial_capital, 1_000_000.0);
    }

    #[test]
    fn build_backtest_config_missing_dates() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nsymbols = IBM\n").unwrap();
        let err = cli::build_backtest_config(&adapter, None).unwrap_err();
        assert!(matches!(err, EodError::ConfigMissing { key, .. } if key == "start_date"));
    }

    #[test]
    fn build_backtest_config_invalid_date() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\nsymbols = IBM\nstart_date = 2022/01/01\nend_date = 2022-02-01\n",
        )
        .unwrap();
        let err = cli::build_backtest_config(&adapter, None).unwrap_err();
        assert!(matches!(err, EodError::ConfigInvalid { .. }));
        assert_eq!(err.exit_status(), 2);
    }

    #[test]
    fn build_momentum_params_reads_section() {
        let adapter = FileConfigAdapter::from_string(
            "[momentum]\nlookback = 5\nmin_cash = 2500\ncash_fraction = 0.2\n",
        )
        .unwrap();
        let params = cli::build_momentum_params(&adapter);
        assert_eq!(params.lookback, 5);
        assert_eq!(params.min_cash, 2_500.0);
        assert_eq!(params.cash_fraction, 0.2);
    }

    #[test]
    fn momentum_defaults_agree_with_validation() {
        let adapter = FileConfigAdapter::from_string("[momentum]\n").unwrap();
        assert!(validate_momentum_config(&adapter).is_ok());
        let params = cli::build_momentum_params(&adapter);
        assert_eq!(params, MomentumParams::default());
        assert_eq!(params.min_cash, DEFAULT_MIN_CASH);
    }

    #[test]
    fn build_plan_reads_report_paths() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let plan = cli::build_plan(&adapter, None).unwrap();
        assert_eq!(plan.series_csv, Some(PathBuf::from("out/series.csv")));
        assert_eq!(plan.chart_svg, Some(PathBuf::from("out/comparison.svg")));
        assert_eq!(plan.evaluate_date, None);
        assert_eq!(plan.query().normalized_symbols(), vec!["CSCO", "IBM"]);
    }
}

mod symbol_resolution {
    use super::*;

    #[test]
    fn override_takes_precedence() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let symbols = cli::resolve_symbols(Some("aapl,msft"), &adapter).unwrap();
        assert_eq!(symbols, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn config_symbols_used_without_override() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        assert_eq!(
            cli::resolve_symbols(None, &adapter).unwrap(),
            vec!["CSCO", "IBM"]
        );
    }

    #[test]
    fn duplicate_override_rejected() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let err = cli::resolve_symbols(Some("IBM,ibm"), &adapter).unwrap_err();
        assert!(matches!(
            err,
            EodError::InvalidSymbols(UniverseError::DuplicateSymbol(_))
        ));
    }

    #[test]
    fn missing_symbols_is_config_error() {
        let adapter = FileConfigAdapter::from_string("[backtest]\n").unwrap();
        let err = cli::resolve_symbols(None, &adapter).unwrap_err();
        assert_eq!(err.exit_status(), 2);
    }
}

mod strategy_resolution {
    use super::*;

    #[test]
    fn defaults_to_both() {
        let adapter = FileConfigAdapter::from_string("[backtest]\n").unwrap();
        assert_eq!(
            cli::resolve_strategies(&adapter).unwrap(),
            vec![StrategyKind::EqualAllocation, StrategyKind::Momentum]
        );
    }

    #[test]
    fn keeps_configured_order_without_duplicates() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\nstrategies = momentum, equal_allocation, buy_on_the_up\n",
        )
        .unwrap();
        assert_eq!(
            cli::resolve_strategies(&adapter).unwrap(),
            vec![StrategyKind::Momentum, StrategyKind::EqualAllocation]
        );
    }

    #[test]
    fn unknown_strategy_rejected() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nstrategies = pairs\n").unwrap();
        assert!(matches!(
            cli::resolve_strategies(&adapter),
            Err(EodError::ConfigInvalid { .. })
        ));
    }
}

mod source_construction {
    use super::*;

    #[test]
    fn csv_source_selected() {
        let adapter =
            FileConfigAdapter::from_string("[data]\nsource = csv\ncsv_dir = /tmp\n").unwrap();
        let source = cli::build_source(&adapter).unwrap();
        assert_eq!(source.name(), "csv");
    }

    #[test]
    fn marketstack_source_selected() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let source = cli::build_source(&adapter).unwrap();
        assert_eq!(source.name(), "marketstack");
    }

    #[test]
    fn unknown_source_rejected() {
        let adapter = FileConfigAdapter::from_string("[data]\nsource = ftp\n").unwrap();
        assert!(matches!(
            cli::build_source(&adapter),
            Err(EodError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn cache_directory_from_config() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let cache = cli::build_cache(&adapter);
        assert_eq!(cache.cache_dir(), Path::new("/tmp/eodtrader-test-cache"));
    }
}

mod csv_pipeline {
    use super::*;

    fn write_symbol(dir: &Path, symbol: &str, rows: &[(&str, f64)]) {
        let mut content = String::from("date,open,high,low,close,volume\n");
        for (day, close) in rows {
            content.push_str(&format!("{day},{close},{close},{close},{close},1000\n"));
        }
        fs::write(dir.join(format!("{symbol}.csv")), content).unwrap();
    }

    #[test]
    fn backtest_over_csv_files() {
        let data_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        write_symbol(
            data_dir.path(),
            "IBM",
            &[("2022-03-01", 100.0), ("2022-03-02", 110.0), ("2022-03-03", 120.0)],
        );
        write_symbol(
            data_dir.path(),
            "CSCO",
            &[("2022-03-01", 50.0), ("2022-03-02", 45.0), ("2022-03-03", 40.0)],
        );

        let ini = format!(
            "[backtest]\nsymbols = IBM, CSCO\nstart_date = 2022-03-01\nend_date = 2022-03-03\n\
             initial_capital = 10000\nstrategies = equal_allocation\n\
             [data]\nsource = csv\ncsv_dir = {}\ncache_dir = {}\n",
            data_dir.path().display(),
            cache_dir.path().display()
        );
        let file = write_temp_ini(&ini);
        let adapter = cli::load_config(file.path()).unwrap();
        assert!(validate_config(&adapter).is_ok());

        let plan = cli::build_plan(&adapter, None).unwrap();
        let mut provider = MarketDataProvider::new(
            cli::build_source(&adapter).unwrap(),
            Some(cli::build_cache(&adapter)),
        );
        let output = cli::run_backtest_pipeline(&mut provider, &plan, false).unwrap();

        let evaluation = &output.evaluations[0];
        // 50 IBM at 100, 100 CSCO at 50; valued at 120 and 40.
        assert_relative_eq!(evaluation.holdings_value, 50.0 * 120.0 + 100.0 * 40.0);
        assert_relative_eq!(evaluation.cash, 0.0);
        assert_relative_eq!(evaluation.net_profit, 0.0);
        assert_eq!(provider.cache().unwrap().entries().unwrap().len(), 1);
    }
}
