//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]). Warmup: first (n-1) bars are invalid.

use crate::domain::bar::Bar;
use crate::domain::error::TradesimError;
use crate::domain::indicator::{check_window, IndicatorPoint, IndicatorSeries};

pub fn sma(bars: &[Bar], period: usize) -> Result<IndicatorSeries, TradesimError> {
    check_window(period, bars.len())?;

    let mut values = Vec::with_capacity(bars.len());
    let mut sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        sum += bar.close;
        if i >= period {
            sum -= bars[i - period].close;
        }
        let valid = i >= period - 1;
        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid,
            value: if valid { sum / period as f64 } else { 0.0 },
        });
    }

    Ok(IndicatorSeries { values })
}
