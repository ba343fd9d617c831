//! Rolling standard deviation.
//!
//! Population standard deviation over n closing prices:
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n-1) / n)
//! Warmup: first (n-1) bars are invalid.

use crate::domain::bar::Bar;
use crate::domain::error::TradesimError;
use crate::domain::indicator::{check_window, IndicatorPoint, IndicatorSeries};

pub fn stddev(bars: &[Bar], period: usize) -> Result<IndicatorSeries, TradesimError> {
    check_window(period, bars.len())?;

    let mut values = Vec::with_capacity(bars.len());
    let warmup = period - 1;

    for (i, bar) in bars.iter().enumerate() {
        let valid = i >= warmup;

        let value = if valid {
            let window = &bars[i + 1 - period..=i];
            let mean: f64 = window.iter().map(|b| b.close).sum::<f64>() / period as f64;
            let variance: f64 = window
                .iter()
                .map(|b| {
                    let diff = b.close - mean;
                    diff * diff
                })
                .sum::<f64>()
                / period as f64;
            variance.sqrt()
        } else {
            0.0
        };

        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid,
            value,
        });
    }

    Ok(IndicatorSeries { values })
}
