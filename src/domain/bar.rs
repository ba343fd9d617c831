//! OHLCV bar representation and series validation.

use chrono::NaiveDateTime;

use super::error::TradesimError;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Validate a bar series before a run.
///
/// A malformed series aborts the backtest rather than being skipped: a
/// silently dropped bar would corrupt the equity curve. Checks, per bar:
/// all price fields finite, volume finite and non-negative, `low <= high`,
/// open/close inside the high/low envelope, one symbol throughout, and
/// strictly increasing timestamps.
pub fn validate_bars(bars: &[Bar]) -> Result<(), TradesimError> {
    let integrity_error = |index: usize, bar: &Bar, reason: String| TradesimError::DataIntegrity {
        symbol: bar.symbol.clone(),
        bar_index: index,
        timestamp: bar.timestamp.to_string(),
        reason,
    };

    for (i, bar) in bars.iter().enumerate() {
        let fields = [
            ("open", bar.open),
            ("high", bar.high),
            ("low", bar.low),
            ("close", bar.close),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(integrity_error(i, bar, format!("non-finite {name}: {value}")));
            }
        }
        if !bar.volume.is_finite() || bar.volume < 0.0 {
            return Err(integrity_error(i, bar, format!("invalid volume: {}", bar.volume)));
        }
        if bar.low > bar.high {
            return Err(integrity_error(
                i,
                bar,
                format!("low {} above high {}", bar.low, bar.high),
            ));
        }
        for (name, value) in [("open", bar.open), ("close", bar.close)] {
            if value < bar.low || value > bar.high {
                return Err(integrity_error(
                    i,
                    bar,
                    format!(
                        "{name} {value} outside [{}, {}] range",
                        bar.low, bar.high
                    ),
                ));
            }
        }
        if bar.symbol != bars[0].symbol {
            return Err(integrity_error(
                i,
                bar,
                format!("mixed symbols: {} and {}", bars[0].symbol, bar.symbol),
            ));
        }
        if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
            return Err(integrity_error(
                i,
                bar,
                format!(
                    "timestamp not increasing: {} follows {}",
                    bar.timestamp,
                    bars[i - 1].timestamp
                ),
            ));
        }
    }

    Ok(())
}
