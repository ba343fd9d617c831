//! CLI definition and dispatch.
//!
//! The CLI is the only layer that prints: stage progress goes to stderr,
//! the summary table to stdout. The domain hands back data.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{
    validate_backtest_config, validate_risk_config, validate_strategy_config,
};
use crate::domain::engine::{run_batch, BacktestConfig, BacktestResult, FillMode};
use crate::domain::error::TradesimError;
use crate::domain::risk::{RiskConfig, RiskManager, StopMethod};
use crate::domain::strategy::mean_reversion::MeanReversion;
use crate::domain::strategy::trend_following::TrendFollowing;
use crate::domain::strategy::Strategy;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "tradesim", about = "Trading strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory for CSV reports (one subdirectory per symbol)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Override the configured symbol(s)
        #[arg(long)]
        symbol: Option<String>,
        /// Validate the configuration and exit
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the available data range for symbol(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            output,
            symbol,
            dry_run,
        } => {
            if dry_run {
                run_validate(&config)
            } else {
                run_backtest_command(&config, output.as_deref(), symbol.as_deref())
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { config } => run_list_symbols(&config),
        Command::Info { config, symbol } => run_info(&config, symbol.as_deref()),
    }
}

/// Parse a comma-separated symbol list, trimming blanks and dropping empties.
pub fn parse_symbols(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn load_config(path: &std::path::Path) -> Result<FileConfigAdapter, TradesimError> {
    FileConfigAdapter::from_file(path).map_err(|e| TradesimError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn fail(err: &TradesimError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

fn validate_all(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    validate_backtest_config(config)?;
    validate_risk_config(config)?;
    validate_strategy_config(config)?;
    Ok(())
}

/// Strategy selection, extracted from config so fresh instances can be
/// built per run (parallel batches need one strategy per dataset).
#[derive(Debug, Clone)]
enum StrategySpec {
    MeanReversion { window: usize, threshold: f64 },
    TrendFollowing { fast: usize, slow: usize },
}

impl StrategySpec {
    fn from_config(config: &dyn ConfigPort) -> Result<Self, TradesimError> {
        let kind = config
            .get_string("strategy", "kind")
            .ok_or_else(|| TradesimError::ConfigMissing {
                section: "strategy".to_string(),
                key: "kind".to_string(),
            })?;
        match kind.as_str() {
            "mean_reversion" => Ok(StrategySpec::MeanReversion {
                window: config.get_int("strategy", "window", 30) as usize,
                threshold: config.get_double("strategy", "threshold", 1.5),
            }),
            "trend_following" => Ok(StrategySpec::TrendFollowing {
                fast: config.get_int("strategy", "fast", 10) as usize,
                slow: config.get_int("strategy", "slow", 30) as usize,
            }),
            other => Err(TradesimError::ConfigInvalid {
                section: "strategy".to_string(),
                key: "kind".to_string(),
                reason: format!("unknown strategy kind '{other}'"),
            }),
        }
    }

    fn build(&self) -> Box<dyn Strategy> {
        match *self {
            StrategySpec::MeanReversion { window, threshold } => {
                Box::new(MeanReversion::new(window, threshold))
            }
            StrategySpec::TrendFollowing { fast, slow } => {
                Box::new(TrendFollowing::new(fast, slow))
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            StrategySpec::MeanReversion { .. } => "mean-reversion",
            StrategySpec::TrendFollowing { .. } => "trend-following",
        }
    }
}

fn build_backtest_config(config: &dyn ConfigPort) -> BacktestConfig {
    let defaults = BacktestConfig::default();
    let fill_mode = config
        .get_string("backtest", "fill_mode")
        .and_then(|v| FillMode::parse(&v))
        .unwrap_or(defaults.fill_mode);
    BacktestConfig {
        initial_capital: config.get_double(
            "backtest",
            "initial_capital",
            defaults.initial_capital,
        ),
        fill_mode,
        bars_per_year: config.get_double("backtest", "bars_per_year", defaults.bars_per_year),
        risk_free_rate: config.get_double("backtest", "risk_free_rate", defaults.risk_free_rate),
        commission_per_trade: config.get_double(
            "backtest",
            "commission_per_trade",
            defaults.commission_per_trade,
        ),
        commission_pct: config.get_double("backtest", "commission_pct", defaults.commission_pct),
        slippage_pct: config.get_double("backtest", "slippage_pct", defaults.slippage_pct),
        atr_period: config.get_int("backtest", "atr_period", defaults.atr_period as i64) as usize,
        ror_seed: config.get_int("backtest", "ror_seed", defaults.ror_seed as i64) as u64,
    }
}

fn build_risk_config(config: &dyn ConfigPort) -> RiskConfig {
    let defaults = RiskConfig::default();
    let stop_method = match config
        .get_string("risk", "stop_method")
        .unwrap_or_else(|| "fixed_pct".to_string())
        .as_str()
    {
        "atr" => StopMethod::AtrMultiple(config.get_double("risk", "atr_multiple", 2.0)),
        _ => StopMethod::FixedPct(config.get_double("risk", "stop_pct", 2.0)),
    };
    let take_profit_rr = match config.get_double("risk", "take_profit_rr", 0.0) {
        rr if rr > 0.0 => Some(rr),
        _ => None,
    };
    RiskConfig {
        risk_per_trade: config.get_double("risk", "risk_per_trade", defaults.risk_per_trade),
        stop_method,
        take_profit_rr,
        lot_size: config.get_double("risk", "lot_size", defaults.lot_size),
        allow_short: config.get_bool("risk", "allow_short", defaults.allow_short),
    }
}

fn resolve_symbols(
    config: &dyn ConfigPort,
    symbol_override: Option<&str>,
) -> Result<Vec<String>, TradesimError> {
    let raw = match symbol_override {
        Some(value) => value.to_string(),
        None => config
            .get_string("backtest", "symbols")
            .or_else(|| config.get_string("backtest", "symbol"))
            .unwrap_or_default(),
    };
    let symbols = parse_symbols(&raw);
    if symbols.is_empty() {
        return Err(TradesimError::ConfigMissing {
            section: "backtest".to_string(),
            key: "symbol".to_string(),
        });
    }
    Ok(symbols)
}

fn data_adapter(config: &dyn ConfigPort) -> Result<CsvAdapter, TradesimError> {
    let path = config
        .get_string("data", "path")
        .ok_or_else(|| TradesimError::ConfigMissing {
            section: "data".to_string(),
            key: "path".to_string(),
        })?;
    Ok(CsvAdapter::new(PathBuf::from(path)))
}

fn date_range(config: &dyn ConfigPort) -> Result<(NaiveDate, NaiveDate), TradesimError> {
    let parse = |key: &str, fallback: NaiveDate| -> Result<NaiveDate, TradesimError> {
        match config.get_string("backtest", key) {
            None => Ok(fallback),
            Some(value) => NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| {
                TradesimError::ConfigInvalid {
                    section: "backtest".to_string(),
                    key: key.to_string(),
                    reason: format!("invalid {key}, expected YYYY-MM-DD"),
                }
            }),
        }
    };
    let start = parse("start_date", NaiveDate::MIN)?;
    let end = parse("end_date", NaiveDate::MAX)?;
    if start >= end {
        return Err(TradesimError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "start_date".to_string(),
            reason: "start_date must be before end_date".to_string(),
        });
    }
    Ok((start, end))
}

fn run_validate(config_path: &std::path::Path) -> ExitCode {
    eprintln!("Validating {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };
    if let Err(e) = validate_all(&adapter) {
        return fail(&e);
    }
    println!("Configuration OK");
    ExitCode::SUCCESS
}

fn run_backtest_command(
    config_path: &std::path::Path,
    output: Option<&std::path::Path>,
    symbol_override: Option<&str>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };
    if let Err(e) = validate_all(&adapter) {
        return fail(&e);
    }

    let spec = match StrategySpec::from_config(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let bt_config = build_backtest_config(&adapter);
    let risk = RiskManager::new(build_risk_config(&adapter));

    let symbols = match resolve_symbols(&adapter, symbol_override) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let data = match data_adapter(&adapter) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };
    let (start, end) = match date_range(&adapter) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    eprintln!(
        "Running {} over {} symbol(s), fill mode {}",
        spec.name(),
        symbols.len(),
        bt_config.fill_mode.as_str()
    );

    let mut datasets = Vec::with_capacity(symbols.len());
    for symbol in &symbols {
        match data.fetch_bars(symbol, start, end) {
            Ok(bars) if bars.is_empty() => {
                return fail(&TradesimError::NoData {
                    symbol: symbol.clone(),
                });
            }
            Ok(bars) => datasets.push(bars),
            Err(e) => return fail(&e),
        }
    }

    let results = run_batch(&datasets, || spec.build(), &risk, &bt_config);

    let reporter = CsvReportAdapter::new();
    for result in results {
        let result = match result {
            Ok(r) => r,
            Err(e) => return fail(&e),
        };
        print_summary(&result);
        if let Some(dir) = output {
            let target = dir.join(&result.symbol);
            if let Err(e) = reporter.write(&result, &target) {
                return fail(&e);
            }
            eprintln!("Report written to {}", target.display());
        }
    }

    ExitCode::SUCCESS
}

fn format_optional(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.4}"),
        None => "n/a".to_string(),
    }
}

fn print_summary(result: &BacktestResult) {
    let report = &result.report;
    println!("=== {} ===", result.symbol);
    println!("  initial capital    {:>14.2}", report.initial_capital);
    println!("  final equity       {:>14.2}", report.final_equity);
    println!("  net profit         {:>14.2}", report.net_profit);
    println!("  ROI                {:>13.2}%", report.roi * 100.0);
    println!(
        "  annualized return  {:>13.2}%",
        report.annualized_return * 100.0
    );
    println!("  sharpe             {:>14}", format_optional(report.sharpe));
    println!(
        "  max drawdown       {:>13.2}%",
        report.max_drawdown * 100.0
    );
    println!(
        "  trades             {:>14} ({} won / {} lost / {} even)",
        report.trades_total, report.trades_won, report.trades_lost, report.trades_breakeven
    );
    println!("  win rate           {:>13.2}%", report.win_rate * 100.0);
    println!(
        "  profit factor      {:>14}",
        format_optional(report.profit_factor)
    );
    println!(
        "  risk-reward        {:>14}",
        format_optional(report.risk_reward_ratio)
    );
    println!(
        "  risk of ruin       {:>14}",
        format_optional(report.risk_of_ruin)
    );
    println!("  score              {:>14.4}", report.score);
    println!("  turnover           {:>14.2}", result.turnover);
    println!("  fees paid          {:>14.2}", result.fees_paid);
    println!("  vetoed entries     {:>14}", result.vetoed_entries);
}

fn run_list_symbols(config_path: &std::path::Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };
    let data = match data_adapter(&adapter) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };
    match data.list_symbols() {
        Ok(symbols) => {
            for symbol in symbols {
                println!("{symbol}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_info(config_path: &std::path::Path, symbol_override: Option<&str>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };
    let data = match data_adapter(&adapter) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };
    let symbols = match resolve_symbols(&adapter, symbol_override) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    for symbol in symbols {
        match data.data_range(&symbol) {
            Ok(Some((first, last, count))) => {
                println!("{symbol}: {count} bars from {first} to {last}");
            }
            Ok(None) => println!("{symbol}: no data"),
            Err(e) => return fail(&e),
        }
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_symbols_splits_and_trims() {
        assert_eq!(parse_symbols("BTC, ETH ,SOL"), vec!["BTC", "ETH", "SOL"]);
    }

    #[test]
    fn parse_symbols_drops_empties() {
        assert_eq!(parse_symbols("BTC,,ETH,"), vec!["BTC", "ETH"]);
        assert!(parse_symbols("").is_empty());
        assert!(parse_symbols(" , ").is_empty());
    }

    #[test]
    fn strategy_spec_builds_configured_kind() {
        let adapter = FileConfigAdapter::from_string(
            "[strategy]\nkind = trend_following\nfast = 5\nslow = 20\n",
        )
        .unwrap();
        let spec = StrategySpec::from_config(&adapter).unwrap();
        assert_eq!(spec.name(), "trend-following");
        let strategy = spec.build();
        assert_eq!(strategy.name(), "trend-following");
        assert_eq!(strategy.warmup_bars(), 22);
    }

    #[test]
    fn strategy_spec_rejects_unknown_kind() {
        let adapter = FileConfigAdapter::from_string("[strategy]\nkind = hodl\n").unwrap();
        assert!(StrategySpec::from_config(&adapter).is_err());
    }

    #[test]
    fn backtest_config_reads_overrides() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\ninitial_capital = 5000\nfill_mode = same_bar_close\n\
             bars_per_year = 365\ncommission_pct = 0.02\n",
        )
        .unwrap();
        let config = build_backtest_config(&adapter);
        assert_eq!(config.initial_capital, 5000.0);
        assert_eq!(config.fill_mode, FillMode::SameBarClose);
        assert_eq!(config.bars_per_year, 365.0);
        assert_eq!(config.commission_pct, 0.02);
        // Untouched keys keep defaults.
        assert_eq!(config.atr_period, 14);
    }

    #[test]
    fn risk_config_reads_stop_method() {
        let adapter = FileConfigAdapter::from_string(
            "[risk]\nstop_method = atr\natr_multiple = 3\nrisk_per_trade = 0.02\n\
             take_profit_rr = 2\nallow_short = yes\n",
        )
        .unwrap();
        let config = build_risk_config(&adapter);
        assert_eq!(config.stop_method, StopMethod::AtrMultiple(3.0));
        assert_eq!(config.risk_per_trade, 0.02);
        assert_eq!(config.take_profit_rr, Some(2.0));
        assert!(config.allow_short);
    }

    #[test]
    fn risk_config_defaults_to_fixed_pct() {
        let adapter = FileConfigAdapter::from_string("[risk]\n").unwrap();
        let config = build_risk_config(&adapter);
        assert_eq!(config.stop_method, StopMethod::FixedPct(2.0));
        assert_eq!(config.take_profit_rr, None);
        assert!(!config.allow_short);
    }

    #[test]
    fn resolve_symbols_prefers_override() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\nsymbols = BTC,ETH\n").unwrap();
        assert_eq!(
            resolve_symbols(&adapter, Some("SOL")).unwrap(),
            vec!["SOL"]
        );
        assert_eq!(
            resolve_symbols(&adapter, None).unwrap(),
            vec!["BTC", "ETH"]
        );
    }

    #[test]
    fn resolve_symbols_errors_when_absent() {
        let adapter = FileConfigAdapter::from_string("[backtest]\n").unwrap();
        assert!(matches!(
            resolve_symbols(&adapter, None),
            Err(TradesimError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn date_range_defaults_to_open_interval() {
        let adapter = FileConfigAdapter::from_string("[backtest]\n").unwrap();
        let (start, end) = date_range(&adapter).unwrap();
        assert_eq!(start, NaiveDate::MIN);
        assert_eq!(end, NaiveDate::MAX);
    }

    #[test]
    fn date_range_rejects_inverted_dates() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\nstart_date = 2024-06-01\nend_date = 2024-01-01\n",
        )
        .unwrap();
        assert!(date_range(&adapter).is_err());
    }

    #[test]
    fn date_range_rejects_bad_format() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\nstart_date = 01/06/2024\n").unwrap();
        assert!(date_range(&adapter).is_err());
    }
}
