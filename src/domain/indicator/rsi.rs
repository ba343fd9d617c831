//! Relative Strength Index with Wilder's smoothing.
//!
//! First average gain/loss: simple mean over the first n price changes.
//! Subsequent: avg = (prev_avg * (n-1) + current) / n.
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss)); 100 when avg_loss == 0.
//! Warmup: first n bars are invalid (n price changes are needed).

use crate::domain::bar::Bar;
use crate::domain::error::TradesimError;
use crate::domain::indicator::{check_window, IndicatorPoint, IndicatorSeries};

pub fn rsi(bars: &[Bar], period: usize) -> Result<IndicatorSeries, TradesimError> {
    if period == 0 {
        return Err(TradesimError::IndicatorPeriod { period });
    }
    // One extra bar relative to the other indicators: changes, not closes.
    check_window(period + 1, bars.len())?;

    let mut gains: Vec<f64> = Vec::with_capacity(bars.len() - 1);
    let mut losses: Vec<f64> = Vec::with_capacity(bars.len() - 1);
    for i in 1..bars.len() {
        let change = bars[i].close - bars[i - 1].close;
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let mut values = Vec::with_capacity(bars.len());
    values.push(IndicatorPoint {
        timestamp: bars[0].timestamp,
        valid: false,
        value: 0.0,
    });

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for (i, bar) in bars.iter().enumerate().skip(1) {
        let change_idx = i - 1;

        if change_idx < period - 1 {
            values.push(IndicatorPoint {
                timestamp: bar.timestamp,
                valid: false,
                value: 0.0,
            });
            continue;
        }

        if change_idx == period - 1 {
            avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
            avg_loss = losses[..period].iter().sum::<f64>() / period as f64;
        } else {
            avg_gain = (avg_gain * (period - 1) as f64 + gains[change_idx]) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + losses[change_idx]) / period as f64;
        }

        let value = if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
        };
        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid: true,
            value,
        });
    }

    Ok(IndicatorSeries { values })
}
