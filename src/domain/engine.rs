//! Backtest engine and event loop.
//!
//! One run replays one symbol's bars in timestamp order through a strategy
//! and a risk manager, mutating a single-owner [`Portfolio`]. Per-bar order
//! is fixed: fill any pending entry at the open, check intrabar protective
//! exits (stop-loss before take-profit), evaluate the strategy on the close,
//! then snapshot equity. A position still open after the final bar is
//! force-closed at the last close.
//!
//! Protective exits fill exactly at their boundary price, even when the bar
//! gaps through it. Signal and end-of-data exits are market orders at the
//! close and pay slippage. Exit checks skip positions entered on the same
//! bar, so a trade always spans at least one bar.

use std::collections::HashMap;

use rayon::prelude::*;

use super::bar::{validate_bars, Bar};
use super::error::TradesimError;
use super::indicator::atr::atr;
use super::indicator::IndicatorSeries;
use super::performance::{EvaluationConfig, PerformanceReport};
use super::portfolio::Portfolio;
use super::position::{Direction, ExitReason, Position, Trade};
use super::risk::RiskManager;
use super::signal::{Signal, SignalKind};
use super::strategy::Strategy;

/// When an entry signal turns into a fill.
///
/// `NextBarOpen` is the default: the signal is computed on the close, so the
/// following open is the earliest causally available price. `SameBarClose`
/// must be requested explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    NextBarOpen,
    SameBarClose,
}

impl FillMode {
    pub fn parse(value: &str) -> Option<FillMode> {
        match value {
            "next_bar_open" => Some(FillMode::NextBarOpen),
            "same_bar_close" => Some(FillMode::SameBarClose),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FillMode::NextBarOpen => "next_bar_open",
            FillMode::SameBarClose => "same_bar_close",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub fill_mode: FillMode,
    /// Annualization factor: how many bars make a year (252 for daily).
    pub bars_per_year: f64,
    /// Annual risk-free rate as a decimal.
    pub risk_free_rate: f64,
    pub commission_per_trade: f64,
    pub commission_pct: f64,
    pub slippage_pct: f64,
    /// ATR lookback supplied to the risk manager as the volatility measure.
    pub atr_period: usize,
    /// Seed for the risk-of-ruin estimator.
    pub ror_seed: u64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 10_000.0,
            fill_mode: FillMode::NextBarOpen,
            bars_per_year: 252.0,
            risk_free_rate: 0.0,
            commission_per_trade: 0.0,
            commission_pct: 0.0,
            slippage_pct: 0.0,
            atr_period: 14,
            ror_seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub symbol: String,
    pub portfolio: Portfolio,
    pub report: PerformanceReport,
    /// Entry signals the risk manager or capital check turned away.
    pub vetoed_entries: usize,
    /// Total traded notional across all fills.
    pub turnover: f64,
    /// Total commission paid.
    pub fees_paid: f64,
}

/// Flat fee plus percentage of traded value.
fn commission(trade_value: f64, config: &BacktestConfig) -> f64 {
    config.commission_per_trade + trade_value * config.commission_pct / 100.0
}

/// Entries fill against you; exits receive less.
fn entry_price_with_slippage(market_price: f64, direction: Direction, slippage_pct: f64) -> f64 {
    market_price * (1.0 + direction.sign() * slippage_pct / 100.0)
}

fn exit_price_with_slippage(market_price: f64, direction: Direction, slippage_pct: f64) -> f64 {
    market_price * (1.0 - direction.sign() * slippage_pct / 100.0)
}

struct RunState {
    portfolio: Portfolio,
    vetoed_entries: usize,
    turnover: f64,
    fees_paid: f64,
}

impl RunState {
    /// Attempt an entry at `market_price`. A veto from the risk manager or
    /// the capital check is recorded, not raised.
    fn try_enter(
        &mut self,
        signal: &Signal,
        bar: &Bar,
        market_price: f64,
        volatility: Option<f64>,
        risk: &RiskManager,
        config: &BacktestConfig,
    ) {
        let direction = match signal.kind {
            SignalKind::EnterLong => Direction::Long,
            SignalKind::EnterShort => Direction::Short,
            _ => return,
        };
        let execution_price =
            entry_price_with_slippage(market_price, direction, config.slippage_pct);

        // Flat by construction when entering, so cash is total equity.
        let equity = self.portfolio.cash;
        let Some(plan) = risk.size_and_protect(signal, equity, execution_price, volatility)
        else {
            self.vetoed_entries += 1;
            return;
        };

        let cost = plan.quantity * execution_price;
        let fee = commission(cost, config);
        if cost + fee > self.portfolio.cash {
            self.vetoed_entries += 1;
            return;
        }

        self.portfolio.cash -= cost + fee;
        self.turnover += cost;
        self.fees_paid += fee;
        self.portfolio.open_position(Position {
            symbol: bar.symbol.clone(),
            direction: plan.direction,
            quantity: plan.quantity,
            entry_price: execution_price,
            entry_time: bar.timestamp,
            stop_loss: plan.stop_loss,
            take_profit: plan.take_profit,
            entry_commission: fee,
        });
    }

    fn exit(
        &mut self,
        symbol: &str,
        price: f64,
        timestamp: chrono::NaiveDateTime,
        reason: ExitReason,
        config: &BacktestConfig,
    ) {
        let Some(position) = self.portfolio.take_position(symbol) else {
            return;
        };

        let exit_value = position.quantity * price;
        let fee = commission(exit_value, config);
        let price_pnl =
            position.direction.sign() * position.quantity * (price - position.entry_price);
        let pnl = price_pnl - position.entry_commission - fee;

        self.portfolio.cash += position.liquidation_value(price) - fee;
        self.turnover += exit_value;
        self.fees_paid += fee;
        self.portfolio.record_trade(Trade {
            symbol: position.symbol,
            direction: position.direction,
            quantity: position.quantity,
            entry_price: position.entry_price,
            exit_price: price,
            entry_time: position.entry_time,
            exit_time: timestamp,
            pnl,
            exit_reason: reason,
        });
    }
}

fn volatility_at(series: Option<&IndicatorSeries>, index: usize) -> Option<f64> {
    series.and_then(|s| s.value_at(index))
}

/// Run one backtest over one symbol's bar series.
pub fn run_backtest<S: Strategy + ?Sized>(
    bars: &[Bar],
    strategy: &mut S,
    risk: &RiskManager,
    config: &BacktestConfig,
) -> Result<BacktestResult, TradesimError> {
    let Some(first) = bars.first() else {
        return Err(TradesimError::NoData {
            symbol: "unknown".to_string(),
        });
    };
    let symbol = first.symbol.clone();
    validate_bars(bars)?;

    // The ATR series is computed once, read-only afterwards; entries read
    // the value at the bar the signal was produced on.
    let volatility = if config.atr_period > 0 && bars.len() > config.atr_period {
        Some(atr(bars, config.atr_period)?)
    } else {
        None
    };

    let mut state = RunState {
        portfolio: Portfolio::new(config.initial_capital),
        vetoed_entries: 0,
        turnover: 0.0,
        fees_paid: 0.0,
    };
    let mut pending_entry: Option<Signal> = None;
    let last = bars.len() - 1;
    let mut prices: HashMap<String, f64> = HashMap::with_capacity(1);

    for (i, bar) in bars.iter().enumerate() {
        // 1. A pending next-bar-open entry fills at this bar's open, sized
        //    with the volatility known at the signal bar. A pending entry
        //    reaching the final bar expires unfilled: it would only be
        //    force-closed at the same timestamp.
        if i < last {
            if let Some(signal) = pending_entry.take() {
                let vol = volatility_at(volatility.as_ref(), i - 1);
                state.try_enter(&signal, bar, bar.open, vol, risk, config);
            }
        }

        // 2. Intrabar protective exits. Stop-loss wins a same-bar tie with
        //    take-profit; both precede the strategy's own exit. Positions
        //    entered on this bar are checked from the next bar, so every
        //    trade's exit timestamp strictly exceeds its entry timestamp.
        let protective_exit = state.portfolio.position(&symbol).and_then(|pos| {
            if pos.entry_time == bar.timestamp {
                None
            } else if pos.stop_hit(bar) {
                Some((pos.stop_loss, ExitReason::StopLoss))
            } else {
                match pos.take_profit {
                    Some(target) if pos.target_hit(bar) => Some((target, ExitReason::TakeProfit)),
                    _ => None,
                }
            }
        });
        if let Some((price, reason)) = protective_exit {
            state.exit(&symbol, price, bar.timestamp, reason, config);
        }

        // 3. Strategy evaluation on the close (mark-to-market price).
        let signal = strategy.decide(&bars[..=i], state.portfolio.position(&symbol));
        match signal.kind {
            SignalKind::Exit => {
                if let Some(direction) = state
                    .portfolio
                    .position(&symbol)
                    .filter(|pos| pos.entry_time != bar.timestamp)
                    .map(|pos| pos.direction)
                {
                    let price =
                        exit_price_with_slippage(bar.close, direction, config.slippage_pct);
                    state.exit(&symbol, price, bar.timestamp, ExitReason::Signal, config);
                }
            }
            SignalKind::EnterLong | SignalKind::EnterShort
                if !state.portfolio.has_position(&symbol) && i < last =>
            {
                match config.fill_mode {
                    FillMode::NextBarOpen => pending_entry = Some(signal),
                    FillMode::SameBarClose => {
                        let vol = volatility_at(volatility.as_ref(), i);
                        state.try_enter(&signal, bar, bar.close, vol, risk, config);
                    }
                }
            }
            _ => {}
        }

        // 4. End of data: force-close whatever is still open at the last close.
        if i == last {
            if let Some(direction) = state.portfolio.position(&symbol).map(|pos| pos.direction)
            {
                let price = exit_price_with_slippage(bar.close, direction, config.slippage_pct);
                state.exit(&symbol, price, bar.timestamp, ExitReason::EndOfData, config);
            }
        }

        // 5. Equity snapshot after all mutations for this bar.
        prices.insert(symbol.clone(), bar.close);
        let equity = state.portfolio.total_equity(&prices);
        state.portfolio.record_equity(bar.timestamp, equity);
    }

    let evaluation = EvaluationConfig {
        risk_free_rate: config.risk_free_rate,
        bars_per_year: config.bars_per_year,
        risk_fraction: risk.config().risk_per_trade,
        seed: config.ror_seed,
    };
    let report = PerformanceReport::compute(
        &state.portfolio.trades,
        &state.portfolio.equity_curve,
        config.initial_capital,
        &evaluation,
    );

    Ok(BacktestResult {
        symbol,
        portfolio: state.portfolio,
        report,
        vetoed_entries: state.vetoed_entries,
        turnover: state.turnover,
        fees_paid: state.fees_paid,
    })
}

/// Run independent backtests over several datasets in parallel.
///
/// Each run owns its portfolio, trade log and equity curve; nothing is
/// shared, so the runs are embarrassingly parallel. Results come back in
/// input order, and each equals what a sequential [`run_backtest`] with a
/// fresh strategy would produce.
pub fn run_batch<S, F>(
    datasets: &[Vec<Bar>],
    make_strategy: F,
    risk: &RiskManager,
    config: &BacktestConfig,
) -> Vec<Result<BacktestResult, TradesimError>>
where
    S: Strategy,
    F: Fn() -> S + Sync,
{
    datasets
        .par_iter()
        .map(|bars| {
            let mut strategy = make_strategy();
            run_backtest(bars, &mut strategy, risk, config)
        })
        .collect()
}
