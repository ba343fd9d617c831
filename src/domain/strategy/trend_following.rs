//! Trend-following strategy.
//!
//! Entry on a fast/slow SMA crossover (long on cross above, short on cross
//! below); exit when the crossover reverses.

use crate::domain::bar::Bar;
use crate::domain::indicator::sma::sma;
use crate::domain::position::{Direction, Position};
use crate::domain::signal::Signal;
use crate::domain::strategy::Strategy;

#[derive(Debug, Clone)]
pub struct TrendFollowing {
    pub fast: usize,
    pub slow: usize,
}

impl TrendFollowing {
    pub fn new(fast: usize, slow: usize) -> Self {
        TrendFollowing { fast, slow }
    }

    /// (fast, slow) SMA values at the previous and current bar.
    fn crossover_state(&self, history: &[Bar]) -> Option<(f64, f64, f64, f64)> {
        let tail = &history[history.len() - (self.slow + 2)..];
        let last = tail.len() - 1;

        let fast_series = sma(tail, self.fast).ok()?;
        let slow_series = sma(tail, self.slow).ok()?;

        Some((
            fast_series.value_at(last - 1)?,
            slow_series.value_at(last - 1)?,
            fast_series.value_at(last)?,
            slow_series.value_at(last)?,
        ))
    }
}

impl Strategy for TrendFollowing {
    fn name(&self) -> &str {
        "trend-following"
    }

    fn warmup_bars(&self) -> usize {
        self.slow + 2
    }

    fn decide(&mut self, history: &[Bar], position: Option<&Position>) -> Signal {
        if history.len() < self.warmup_bars() {
            return Signal::hold();
        }
        let Some((fast_prev, slow_prev, fast_now, slow_now)) = self.crossover_state(history)
        else {
            return Signal::hold();
        };

        let crossed_up = fast_now > slow_now && fast_prev <= slow_prev;
        let crossed_down = fast_now < slow_now && fast_prev >= slow_prev;

        match position {
            None if crossed_up => Signal::enter_long(),
            None if crossed_down => Signal::enter_short(),
            Some(pos) if pos.direction == Direction::Long && crossed_down => Signal::exit(),
            Some(pos) if pos.direction == Direction::Short && crossed_up => Signal::exit(),
            _ => Signal::hold(),
        }
    }
}
