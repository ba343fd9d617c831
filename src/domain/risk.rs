//! Position sizing and stop-loss/take-profit placement.
//!
//! Fixed-fractional sizing: the quantity is chosen so a stop-loss hit loses
//! `risk_per_trade` of current equity (scaled by signal strength when one is
//! attached). A veto (`None`) is a normal outcome, not an error: quantity
//! floored to zero, equity exhausted, shorting disabled, or no usable stop
//! distance.

use super::position::Direction;
use super::signal::{Signal, SignalKind};

/// How the stop distance is derived from the entry price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopMethod {
    /// Distance = multiple × current volatility (ATR).
    AtrMultiple(f64),
    /// Distance = pct/100 × entry price.
    FixedPct(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    /// Fraction of equity lost if the stop is hit, in (0, 1].
    pub risk_per_trade: f64,
    pub stop_method: StopMethod,
    /// Take-profit distance as a multiple of the stop distance. None: no target.
    pub take_profit_rr: Option<f64>,
    /// Minimum tradeable unit; quantities are floored to a multiple of it.
    pub lot_size: f64,
    pub allow_short: bool,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            risk_per_trade: 0.01,
            stop_method: StopMethod::FixedPct(2.0),
            take_profit_rr: None,
            lot_size: 1.0,
            allow_short: false,
        }
    }
}

/// A sized entry with its protective boundaries attached.
#[derive(Debug, Clone, PartialEq)]
pub struct TradePlan {
    pub direction: Direction,
    pub quantity: f64,
    pub stop_loss: f64,
    pub take_profit: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Self {
        RiskManager { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Size an entry signal and attach stop-loss/take-profit boundaries.
    ///
    /// `volatility` is the current ATR when available; required for the
    /// [`StopMethod::AtrMultiple`] method. Returns `None` to veto.
    pub fn size_and_protect(
        &self,
        signal: &Signal,
        equity: f64,
        price: f64,
        volatility: Option<f64>,
    ) -> Option<TradePlan> {
        let direction = match signal.kind {
            SignalKind::EnterLong => Direction::Long,
            SignalKind::EnterShort => Direction::Short,
            SignalKind::Exit | SignalKind::Hold => return None,
        };
        if direction == Direction::Short && !self.config.allow_short {
            return None;
        }
        // Capital preservation over mechanical continuation.
        if equity <= 0.0 || price <= 0.0 {
            return None;
        }
        if self.config.risk_per_trade <= 0.0 || self.config.risk_per_trade > 1.0 {
            return None;
        }

        let distance = match self.config.stop_method {
            StopMethod::AtrMultiple(mult) => volatility? * mult,
            StopMethod::FixedPct(pct) => price * pct / 100.0,
        };
        // The stop must sit strictly on the losing side of the entry, at a
        // price that is still positive.
        if distance <= 0.0 || (direction == Direction::Long && distance >= price) {
            return None;
        }

        let strength = signal.strength.unwrap_or(1.0).clamp(0.0, 1.0);
        let risk_amount = equity * self.config.risk_per_trade * strength;
        let raw_quantity = risk_amount / distance;
        let quantity = (raw_quantity / self.config.lot_size).floor() * self.config.lot_size;
        if quantity <= 0.0 {
            return None;
        }

        let stop_loss = price - direction.sign() * distance;
        let take_profit = self
            .config
            .take_profit_rr
            .map(|rr| price + direction.sign() * distance * rr);

        Some(TradePlan {
            direction,
            quantity,
            stop_loss,
            take_profit,
        })
    }
}
