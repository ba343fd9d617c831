//! Portfolio state and equity tracking.
//!
//! Mutated only by the backtest engine, once per bar, in a fixed order.
//! At most one open position per symbol.

use chrono::NaiveDateTime;
use std::collections::HashMap;

use super::position::{Position, Trade};

#[derive(Debug, Clone, PartialEq)]
pub struct EquitySnapshot {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: HashMap<String, Position>,
    pub realized_pnl: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquitySnapshot>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            positions: HashMap::new(),
            realized_pnl: 0.0,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn open_position(&mut self, position: Position) {
        self.positions.insert(position.symbol.clone(), position);
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn take_position(&mut self, symbol: &str) -> Option<Position> {
        self.positions.remove(symbol)
    }

    /// Append a closed trade; realized P&L accumulates its net result.
    pub fn record_trade(&mut self, trade: Trade) {
        self.realized_pnl += trade.pnl;
        self.trades.push(trade);
    }

    pub fn record_equity(&mut self, timestamp: NaiveDateTime, equity: f64) {
        self.equity_curve.push(EquitySnapshot { timestamp, equity });
    }

    /// Cash plus the liquidation value of every open position.
    pub fn total_equity(&self, prices: &HashMap<String, f64>) -> f64 {
        let position_value: f64 = self
            .positions
            .values()
            .filter_map(|pos| {
                prices
                    .get(&pos.symbol)
                    .map(|&price| pos.liquidation_value(price))
            })
            .sum();
        self.cash + position_value
    }

    pub fn unrealized_pnl(&self, prices: &HashMap<String, f64>) -> f64 {
        self.positions
            .values()
            .filter_map(|pos| {
                prices
                    .get(&pos.symbol)
                    .map(|&price| pos.unrealized_pnl(price))
            })
            .sum()
    }

    /// Check the bookkeeping invariant at the given prices:
    /// equity == initial capital + realized P&L + unrealized P&L
    ///           - entry commissions of still-open positions.
    pub fn reconciles(&self, prices: &HashMap<String, f64>, tolerance: f64) -> bool {
        let open_entry_fees: f64 = self.positions.values().map(|p| p.entry_commission).sum();
        let expected =
            self.initial_capital + self.realized_pnl + self.unrealized_pnl(prices) - open_entry_fees;
        (self.total_equity(prices) - expected).abs() <= tolerance
    }
}
