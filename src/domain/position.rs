//! Open positions and closed trade records.

use chrono::NaiveDateTime;

use super::bar::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1.0 for long, -1.0 for short.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

/// An open exposure, owned exclusively by the portfolio.
///
/// Created on fill, removed on exit/stop/target. `entry_commission` is
/// carried so the closing trade's P&L can be net of the round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub direction: Direction,
    pub quantity: f64,
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
    pub stop_loss: f64,
    pub take_profit: Option<f64>,
    pub entry_commission: f64,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.direction == Direction::Long
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.direction.sign() * self.quantity * (price - self.entry_price)
    }

    /// Cash returned by closing at `price`, before exit commission.
    ///
    /// Longs liquidate at market value. Shorts escrowed the entry notional
    /// on entry and settle the price difference on exit.
    pub fn liquidation_value(&self, price: f64) -> f64 {
        match self.direction {
            Direction::Long => self.quantity * price,
            Direction::Short => self.quantity * (2.0 * self.entry_price - price),
        }
    }

    /// Whether the stop-loss is breached anywhere inside the bar's range.
    pub fn stop_hit(&self, bar: &Bar) -> bool {
        match self.direction {
            Direction::Long => bar.low <= self.stop_loss,
            Direction::Short => bar.high >= self.stop_loss,
        }
    }

    /// Whether the take-profit is reached anywhere inside the bar's range.
    pub fn target_hit(&self, bar: &Bar) -> bool {
        match (self.take_profit, self.direction) {
            (None, _) => false,
            (Some(tp), Direction::Long) => bar.high >= tp,
            (Some(tp), Direction::Short) => bar.low <= tp,
        }
    }
}

/// Why a position was closed. Same-bar ties resolve in this order:
/// stop-loss, then take-profit, then strategy exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Signal,
    StopLoss,
    TakeProfit,
    EndOfData,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Signal => "signal",
            ExitReason::StopLoss => "stop-loss",
            ExitReason::TakeProfit => "take-profit",
            ExitReason::EndOfData => "end-of-data",
        }
    }
}

/// A closed position. Immutable once appended to the trade log.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub symbol: String,
    pub direction: Direction,
    pub quantity: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub pnl: f64,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.pnl < 0.0
    }
}
