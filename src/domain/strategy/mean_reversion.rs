//! Mean-reversion strategy.
//!
//! Entry when the close deviates from its rolling mean by more than
//! `threshold` standard deviations (long below the band, short above);
//! exit when the z-score crosses back through zero.

use crate::domain::bar::Bar;
use crate::domain::indicator::sma::sma;
use crate::domain::indicator::stddev::stddev;
use crate::domain::position::{Direction, Position};
use crate::domain::signal::Signal;
use crate::domain::strategy::Strategy;

#[derive(Debug, Clone)]
pub struct MeanReversion {
    pub window: usize,
    pub threshold: f64,
}

impl MeanReversion {
    pub fn new(window: usize, threshold: f64) -> Self {
        MeanReversion { window, threshold }
    }

    fn zscore(&self, history: &[Bar]) -> Option<f64> {
        let tail = &history[history.len() - (self.window + 1)..];
        let last = tail.len() - 1;

        let mean = sma(tail, self.window).ok()?.value_at(last)?;
        let sd = stddev(tail, self.window).ok()?.value_at(last)?;
        if sd == 0.0 {
            return None;
        }
        Some((tail[last].close - mean) / sd)
    }
}

impl Strategy for MeanReversion {
    fn name(&self) -> &str {
        "mean-reversion"
    }

    fn warmup_bars(&self) -> usize {
        self.window + 1
    }

    fn decide(&mut self, history: &[Bar], position: Option<&Position>) -> Signal {
        if history.len() < self.warmup_bars() {
            return Signal::hold();
        }
        let Some(z) = self.zscore(history) else {
            return Signal::hold();
        };

        match position {
            None if z <= -self.threshold => Signal::enter_long(),
            None if z >= self.threshold => Signal::enter_short(),
            Some(pos) if pos.direction == Direction::Long && z >= 0.0 => Signal::exit(),
            Some(pos) if pos.direction == Direction::Short && z <= 0.0 => Signal::exit(),
            _ => Signal::hold(),
        }
    }
}
