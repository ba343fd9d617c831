#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

use tradesim::domain::bar::Bar;
use tradesim::domain::engine::BacktestConfig;
use tradesim::domain::error::TradesimError;
use tradesim::domain::position::Position;
use tradesim::domain::risk::{RiskConfig, RiskManager, StopMethod};
use tradesim::domain::signal::Signal;
use tradesim::domain::strategy::Strategy;
use tradesim::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, TradesimError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TradesimError::DataIntegrity {
                symbol: symbol.to_string(),
                bar_index: 0,
                timestamp: String::new(),
                reason: reason.clone(),
            });
        }
        let mut bars = self.data.get(symbol).cloned().unwrap_or_default();
        bars.retain(|b| {
            let date = b.timestamp.date();
            date >= start_date && date <= end_date
        });
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TradesimError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TradesimError> {
        match self.data.get(symbol) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.timestamp.date()).min().unwrap();
                let max = bars.iter().map(|b| b.timestamp.date()).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn ts(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A bar with a one-unit body envelope around the close.
pub fn make_bar(symbol: &str, day: u32, close: f64) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        timestamp: ts(day),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000.0,
    }
}

pub fn make_ohlc_bar(symbol: &str, day: u32, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        timestamp: ts(day),
        open,
        high,
        low,
        close,
        volume: 1000.0,
    }
}

/// Bars from a close series, starting at 2024-01-01, one per day.
pub fn bars_from_closes(symbol: &str, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            symbol: symbol.to_string(),
            timestamp: ts(1) + chrono::Duration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        })
        .collect()
}

pub fn sample_backtest_config() -> BacktestConfig {
    BacktestConfig {
        initial_capital: 1_000.0,
        atr_period: 0,
        ..BacktestConfig::default()
    }
}

/// 40% risked against a 50% stop: notional ~80% of cash per entry and a
/// stop far enough away that well-behaved fixtures never trigger it.
pub fn wide_stop_risk() -> RiskManager {
    RiskManager::new(RiskConfig {
        risk_per_trade: 0.4,
        stop_method: StopMethod::FixedPct(50.0),
        take_profit_rr: None,
        lot_size: 1.0,
        allow_short: true,
    })
}

/// Emits a fixed signal at configured bar indices, Hold everywhere else.
pub struct ScriptedStrategy {
    signals: HashMap<usize, Signal>,
}

impl ScriptedStrategy {
    pub fn new(signals: impl IntoIterator<Item = (usize, Signal)>) -> Self {
        ScriptedStrategy {
            signals: signals.into_iter().collect(),
        }
    }
}

impl Strategy for ScriptedStrategy {
    fn name(&self) -> &str {
        "scripted"
    }

    fn warmup_bars(&self) -> usize {
        0
    }

    fn decide(&mut self, history: &[Bar], _position: Option<&Position>) -> Signal {
        self.signals
            .get(&(history.len() - 1))
            .copied()
            .unwrap_or_else(Signal::hold)
    }
}
