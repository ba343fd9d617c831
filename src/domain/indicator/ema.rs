//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) bars are invalid.

use crate::domain::bar::Bar;
use crate::domain::error::TradesimError;
use crate::domain::indicator::{check_window, IndicatorPoint, IndicatorSeries};

pub fn ema(bars: &[Bar], period: usize) -> Result<IndicatorSeries, TradesimError> {
    check_window(period, bars.len())?;

    let mut values = Vec::with_capacity(bars.len());
    let k = 2.0 / (period as f64 + 1.0);
    let mut current = 0.0;
    let mut sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i < period - 1 {
            sum += bar.close;
            values.push(IndicatorPoint {
                timestamp: bar.timestamp,
                valid: false,
                value: 0.0,
            });
        } else if i == period - 1 {
            sum += bar.close;
            current = sum / period as f64;
            values.push(IndicatorPoint {
                timestamp: bar.timestamp,
                valid: true,
                value: current,
            });
        } else {
            current = bar.close * k + current * (1.0 - k);
            values.push(IndicatorPoint {
                timestamp: bar.timestamp,
                valid: true,
                value: current,
            });
        }
    }

    Ok(IndicatorSeries { values })
}
