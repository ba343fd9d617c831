//! Technical indicator implementations.
//!
//! Every indicator is a pure function `(bars, period) -> IndicatorSeries`:
//! deterministic, side-effect free, and strictly causal — the value at index
//! `i` depends only on bars `0..=i`. The output has the same length as the
//! input, with `valid: false` points while the lookback window is still
//! filling. A zero period or a window that is not strictly smaller than the
//! series is an error, never a panic.

pub mod atr;
pub mod ema;
pub mod rsi;
pub mod sma;
pub mod stddev;

use chrono::NaiveDateTime;

use super::error::TradesimError;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub valid: bool,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// The value at `index`, or `None` while the window is incomplete
    /// (or out of range).
    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values
            .get(index)
            .filter(|point| point.valid)
            .map(|point| point.value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Shared parameter check: positive period, window strictly inside the series.
pub(crate) fn check_window(period: usize, len: usize) -> Result<(), TradesimError> {
    if period == 0 {
        return Err(TradesimError::IndicatorPeriod { period });
    }
    if period >= len {
        return Err(TradesimError::IndicatorWindow { period, len });
    }
    Ok(())
}
