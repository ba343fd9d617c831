//! CSV report adapter.
//!
//! Writes three files into the output directory: `summary.csv` (one metric
//! per row), `trades.csv` (one row per closed trade) and `equity.csv` (one
//! row per snapshot). Undefined metrics stay empty fields; they are never
//! coerced into numbers.

use std::fs;
use std::path::Path;

use crate::domain::engine::BacktestResult;
use crate::domain::error::TradesimError;
use crate::ports::report_port::ReportPort;

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        CsvReportAdapter
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn csv_error(e: csv::Error) -> TradesimError {
    TradesimError::Report {
        reason: e.to_string(),
    }
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_dir: &Path) -> Result<(), TradesimError> {
        fs::create_dir_all(output_dir)?;
        let report = &result.report;

        let mut summary =
            csv::Writer::from_path(output_dir.join("summary.csv")).map_err(csv_error)?;
        summary.write_record(["metric", "value"]).map_err(csv_error)?;
        let rows: Vec<(&str, String)> = vec![
            ("symbol", result.symbol.clone()),
            ("initial_capital", report.initial_capital.to_string()),
            ("final_equity", report.final_equity.to_string()),
            ("net_profit", report.net_profit.to_string()),
            ("roi", report.roi.to_string()),
            ("annualized_return", report.annualized_return.to_string()),
            (
                "annualized_volatility",
                optional(report.annualized_volatility),
            ),
            ("sharpe", optional(report.sharpe)),
            ("max_drawdown", report.max_drawdown.to_string()),
            ("trades_total", report.trades_total.to_string()),
            ("trades_won", report.trades_won.to_string()),
            ("trades_lost", report.trades_lost.to_string()),
            ("trades_breakeven", report.trades_breakeven.to_string()),
            ("win_rate", report.win_rate.to_string()),
            ("profit_factor", optional(report.profit_factor)),
            ("avg_win", report.avg_win.to_string()),
            ("avg_loss", report.avg_loss.to_string()),
            ("risk_reward_ratio", optional(report.risk_reward_ratio)),
            ("risk_of_ruin", optional(report.risk_of_ruin)),
            ("score", report.score.to_string()),
            ("turnover", result.turnover.to_string()),
            ("fees_paid", result.fees_paid.to_string()),
            ("vetoed_entries", result.vetoed_entries.to_string()),
        ];
        for (metric, value) in rows {
            summary.write_record([metric, &value]).map_err(csv_error)?;
        }
        summary.flush()?;

        let mut trades =
            csv::Writer::from_path(output_dir.join("trades.csv")).map_err(csv_error)?;
        trades
            .write_record([
                "symbol",
                "direction",
                "quantity",
                "entry_time",
                "entry_price",
                "exit_time",
                "exit_price",
                "pnl",
                "exit_reason",
            ])
            .map_err(csv_error)?;
        for trade in &result.portfolio.trades {
            let direction = if trade.direction == crate::domain::position::Direction::Long {
                "long"
            } else {
                "short"
            };
            trades
                .write_record([
                    trade.symbol.as_str(),
                    direction,
                    &trade.quantity.to_string(),
                    &trade.entry_time.to_string(),
                    &trade.entry_price.to_string(),
                    &trade.exit_time.to_string(),
                    &trade.exit_price.to_string(),
                    &trade.pnl.to_string(),
                    trade.exit_reason.as_str(),
                ])
                .map_err(csv_error)?;
        }
        trades.flush()?;

        let mut equity =
            csv::Writer::from_path(output_dir.join("equity.csv")).map_err(csv_error)?;
        equity.write_record(["timestamp", "equity"]).map_err(csv_error)?;
        for snapshot in &result.portfolio.equity_curve {
            equity
                .write_record([snapshot.timestamp.to_string(), snapshot.equity.to_string()])
                .map_err(csv_error)?;
        }
        equity.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::engine::{run_backtest, BacktestConfig};
    use crate::domain::risk::{RiskConfig, RiskManager, StopMethod};
    use crate::domain::signal::Signal;
    use crate::domain::strategy::Strategy;
    use crate::domain::{bar::Bar, position::Position};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    struct EnterOnce {
        done: bool,
    }

    impl Strategy for EnterOnce {
        fn name(&self) -> &str {
            "enter-once"
        }
        fn warmup_bars(&self) -> usize {
            0
        }
        fn decide(&mut self, _history: &[Bar], position: Option<&Position>) -> Signal {
            if self.done || position.is_some() {
                return Signal::hold();
            }
            self.done = true;
            Signal::enter_long()
        }
    }

    fn sample_result() -> crate::domain::engine::BacktestResult {
        let bars: Vec<Bar> = (1..=5)
            .map(|d| {
                let price = 100.0 + d as f64;
                Bar {
                    symbol: "BTC".into(),
                    timestamp: NaiveDate::from_ymd_opt(2024, 1, d)
                        .unwrap()
                        .and_hms_opt(0, 0, 0)
                        .unwrap(),
                    open: price,
                    high: price + 1.0,
                    low: price - 1.0,
                    close: price,
                    volume: 1000.0,
                }
            })
            .collect();
        let risk = RiskManager::new(RiskConfig {
            risk_per_trade: 0.1,
            stop_method: StopMethod::FixedPct(20.0),
            take_profit_rr: None,
            lot_size: 1.0,
            allow_short: false,
        });
        let config = BacktestConfig {
            initial_capital: 1_000.0,
            atr_period: 0,
            ..BacktestConfig::default()
        };
        let mut strategy = EnterOnce { done: false };
        run_backtest(&bars, &mut strategy, &risk, &config).unwrap()
    }

    #[test]
    fn writes_all_three_files() {
        let dir = TempDir::new().unwrap();
        let result = sample_result();
        CsvReportAdapter::new().write(&result, dir.path()).unwrap();

        for name in ["summary.csv", "trades.csv", "equity.csv"] {
            assert!(dir.path().join(name).exists(), "{name} missing");
        }
    }

    #[test]
    fn trades_csv_has_one_row_per_trade() {
        let dir = TempDir::new().unwrap();
        let result = sample_result();
        CsvReportAdapter::new().write(&result, dir.path()).unwrap();

        let content = fs::read_to_string(dir.path().join("trades.csv")).unwrap();
        let data_rows = content.lines().count() - 1;
        assert_eq!(data_rows, result.portfolio.trades.len());
        assert!(content.contains("end-of-data"));
    }

    #[test]
    fn equity_csv_has_one_row_per_snapshot() {
        let dir = TempDir::new().unwrap();
        let result = sample_result();
        CsvReportAdapter::new().write(&result, dir.path()).unwrap();

        let content = fs::read_to_string(dir.path().join("equity.csv")).unwrap();
        assert_eq!(
            content.lines().count() - 1,
            result.portfolio.equity_curve.len()
        );
    }

    #[test]
    fn undefined_metrics_stay_empty() {
        let dir = TempDir::new().unwrap();
        let mut result = sample_result();
        result.report.sharpe = None;
        result.report.profit_factor = None;
        CsvReportAdapter::new().write(&result, dir.path()).unwrap();

        let content = fs::read_to_string(dir.path().join("summary.csv")).unwrap();
        assert!(content.lines().any(|l| l == "sharpe,"));
        assert!(content.lines().any(|l| l == "profit_factor,"));
    }

    #[test]
    fn creates_output_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("reports").join("BTC");
        CsvReportAdapter::new()
            .write(&sample_result(), &nested)
            .unwrap();
        assert!(nested.join("summary.csv").exists());
    }
}
