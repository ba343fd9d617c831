//! Performance metrics derived from a completed run.
//!
//! Everything here is computed from the trade log and the equity curve
//! alone; raw price data is never touched again. Metrics that are
//! mathematically undefined for the given inputs (profit factor with no
//! losers, Sharpe on a flat curve, risk-reward with a one-sided log) are
//! `None`, never infinity or a stand-in number.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::portfolio::EquitySnapshot;
use super::position::Trade;

/// Monte-Carlo parameters for the risk-of-ruin estimator.
const RUIN_PATHS: usize = 10_000;
const RUIN_HORIZON: usize = 1_000;
const RUIN_THRESHOLD: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationConfig {
    /// Annual risk-free rate as a decimal.
    pub risk_free_rate: f64,
    /// How many bars make a year.
    pub bars_per_year: f64,
    /// Per-trade risk fraction, fed to the risk-of-ruin estimator.
    pub risk_fraction: f64,
    /// RNG seed for the risk-of-ruin estimator.
    pub seed: u64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        EvaluationConfig {
            risk_free_rate: 0.0,
            bars_per_year: 252.0,
            risk_fraction: 0.01,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    pub initial_capital: f64,
    pub final_equity: f64,
    /// Final equity minus initial capital.
    pub net_profit: f64,
    pub roi: f64,
    pub annualized_return: f64,
    pub annualized_volatility: Option<f64>,
    pub sharpe: Option<f64>,
    pub max_drawdown: f64,
    pub trades_total: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    /// 0 by convention on an empty trade log.
    pub win_rate: f64,
    pub profit_factor: Option<f64>,
    pub avg_win: f64,
    pub avg_loss: f64,
    /// Mean winning P&L over mean losing P&L magnitude.
    pub risk_reward_ratio: Option<f64>,
    pub risk_of_ruin: Option<f64>,
    /// Composite: 0.7·Sharpe − 0.2·max drawdown − 0.1·(turnover / 1e6).
    pub score: f64,
}

impl PerformanceReport {
    pub fn compute(
        trades: &[Trade],
        equity_curve: &[EquitySnapshot],
        initial_capital: f64,
        config: &EvaluationConfig,
    ) -> Self {
        let final_equity = equity_curve
            .last()
            .map(|point| point.equity)
            .unwrap_or(initial_capital);
        let net_profit = final_equity - initial_capital;
        let roi = if initial_capital > 0.0 {
            net_profit / initial_capital
        } else {
            0.0
        };

        let bars = equity_curve.len() as f64;
        let annualized_return = if bars > 0.0 && 1.0 + roi > 0.0 {
            (1.0 + roi).powf(config.bars_per_year / bars) - 1.0
        } else if 1.0 + roi <= 0.0 {
            -1.0
        } else {
            0.0
        };

        let max_drawdown = compute_max_drawdown(equity_curve);
        let rf_per_bar = config.risk_free_rate / config.bars_per_year;
        let (sharpe, annualized_volatility) =
            compute_sharpe(equity_curve, rf_per_bar, config.bars_per_year);

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut gross_win = 0.0_f64;
        let mut gross_loss = 0.0_f64;
        for trade in trades {
            if trade.is_win() {
                trades_won += 1;
                gross_win += trade.pnl;
            } else if trade.is_loss() {
                trades_lost += 1;
                gross_loss += trade.pnl.abs();
            } else {
                trades_breakeven += 1;
            }
        }
        let trades_total = trades.len();

        let win_rate = if trades_total > 0 {
            trades_won as f64 / trades_total as f64
        } else {
            0.0
        };

        let profit_factor = if gross_loss > 0.0 {
            Some(gross_win / gross_loss)
        } else {
            // No losing trades: the ratio has no denominator.
            None
        };

        let avg_win = if trades_won > 0 {
            gross_win / trades_won as f64
        } else {
            0.0
        };
        let avg_loss = if trades_lost > 0 {
            gross_loss / trades_lost as f64
        } else {
            0.0
        };
        let risk_reward_ratio = if trades_won > 0 && trades_lost > 0 {
            Some(avg_win / avg_loss)
        } else {
            None
        };

        let risk_of_ruin = if trades_total > 0 {
            Some(estimate_risk_of_ruin(
                win_rate,
                risk_reward_ratio.unwrap_or(0.0),
                config.risk_fraction,
                config.seed,
            ))
        } else {
            None
        };

        let turnover: f64 = trades
            .iter()
            .map(|t| t.quantity * (t.entry_price + t.exit_price))
            .sum();
        let score = 0.7 * sharpe.unwrap_or(0.0) - 0.2 * max_drawdown - 0.1 * (turnover / 1e6);

        PerformanceReport {
            initial_capital,
            final_equity,
            net_profit,
            roi,
            annualized_return,
            annualized_volatility,
            sharpe,
            max_drawdown,
            trades_total,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate,
            profit_factor,
            avg_win,
            avg_loss,
            risk_reward_ratio,
            risk_of_ruin,
            score,
        }
    }
}

/// Largest peak-to-trough decline, as a fraction of the peak.
/// Single forward scan tracking the running peak.
fn compute_max_drawdown(equity_curve: &[EquitySnapshot]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        } else if peak > 0.0 {
            let dd = (peak - point.equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    // Equity below zero would read as a >100% decline; cap at total loss.
    max_dd.min(1.0)
}

/// (annualized Sharpe, annualized volatility) from per-bar returns.
/// Both are `None` when fewer than two snapshots exist or the returns have
/// zero variance (a flat curve has no meaningful Sharpe).
fn compute_sharpe(
    equity_curve: &[EquitySnapshot],
    rf_per_bar: f64,
    bars_per_year: f64,
) -> (Option<f64>, Option<f64>) {
    if equity_curve.len() < 2 {
        return (None, None);
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            if w[0].equity > 0.0 {
                (w[1].equity - w[0].equity) / w[0].equity
            } else {
                0.0
            }
        })
        .collect();

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    if stddev == 0.0 {
        return (None, None);
    }

    let sharpe = (mean - rf_per_bar) / stddev * bars_per_year.sqrt();
    let volatility = stddev * bars_per_year.sqrt();
    (Some(sharpe), Some(volatility))
}

/// Monte-Carlo risk of ruin.
///
/// Simulates `RUIN_PATHS` equity paths of up to `RUIN_HORIZON` trades. Each
/// trade risks `risk_fraction` of current equity: it wins
/// `risk_fraction * risk_reward` with probability `win_rate`, otherwise
/// loses `risk_fraction`. A path is ruined once equity drops below
/// `RUIN_THRESHOLD` of its start. Deterministic for a given seed.
fn estimate_risk_of_ruin(win_rate: f64, risk_reward: f64, risk_fraction: f64, seed: u64) -> f64 {
    if risk_fraction <= 0.0 {
        return 0.0;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut ruined = 0usize;

    for _ in 0..RUIN_PATHS {
        let mut equity = 1.0_f64;
        for _ in 0..RUIN_HORIZON {
            if rng.r#gen::<f64>() < win_rate {
                equity *= 1.0 + risk_fraction * risk_reward;
            } else {
                equity *= 1.0 - risk_fraction;
            }
            if equity < RUIN_THRESHOLD {
                ruined += 1;
                break;
            }
        }
    }

    ruined as f64 / RUIN_PATHS as f64
}
