//! Average True Range with Wilder's smoothing.
//!
//! Seed: simple mean of the first n true ranges (the first bar's true range
//! is high - low). Then ATR[i] = (ATR[i-1]*(n-1) + TR[i]) / n.
//! Warmup: first (n-1) bars are invalid.

use crate::domain::bar::Bar;
use crate::domain::error::TradesimError;
use crate::domain::indicator::{check_window, IndicatorPoint, IndicatorSeries};

pub fn atr(bars: &[Bar], period: usize) -> Result<IndicatorSeries, TradesimError> {
    check_window(period, bars.len())?;

    let mut tr_values: Vec<f64> = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let tr = if i == 0 {
            bar.high - bar.low
        } else {
            bar.true_range(bars[i - 1].close)
        };
        tr_values.push(tr);
    }

    let mut values: Vec<IndicatorPoint> = Vec::with_capacity(bars.len());
    let mut current = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i < period - 1 {
            values.push(IndicatorPoint {
                timestamp: bar.timestamp,
                valid: false,
                value: 0.0,
            });
        } else if i == period - 1 {
            current = tr_values[0..=i].iter().sum::<f64>() / period as f64;
            values.push(IndicatorPoint {
                timestamp: bar.timestamp,
                valid: true,
                value: current,
            });
        } else {
            current = (current * (period - 1) as f64 + tr_values[i]) / period as f64;
            values.push(IndicatorPoint {
                timestamp: bar.timestamp,
                valid: true,
                value: current,
            });
        }
    }

    Ok(IndicatorSeries { values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bar(day: u32, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            symbol: "TEST".into(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn atr_warmup_and_length() {
        let bars: Vec<Bar> = (1..=5).map(|i| make_bar(i, 110.0, 90.0, 100.0)).collect();
        let series = atr(&bars, 3).unwrap();

        assert_eq!(series.len(), 5);
        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[3].valid);
        assert!(series.values[4].valid);
    }

    #[test]
    fn atr_seed_is_average_true_range() {
        let bars = vec![
            make_bar(1, 110.0, 100.0, 105.0),
            make_bar(2, 115.0, 105.0, 110.0),
            make_bar(3, 120.0, 110.0, 115.0),
            make_bar(4, 125.0, 115.0, 120.0),
        ];
        let series = atr(&bars, 3).unwrap();

        let expected = (10.0 + 10.0 + 10.0) / 3.0;
        assert!((series.value_at(2).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn atr_wilder_smoothing() {
        let bars = vec![
            make_bar(1, 110.0, 100.0, 105.0),
            make_bar(2, 115.0, 105.0, 110.0),
            make_bar(3, 120.0, 110.0, 115.0),
            make_bar(4, 125.0, 115.0, 120.0),
        ];
        let series = atr(&bars, 3).unwrap();

        let seed = 10.0;
        let expected = (seed * 2.0 + 10.0) / 3.0;
        assert!((series.value_at(3).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn atr_gap_extends_true_range() {
        let bars = vec![
            make_bar(1, 110.0, 100.0, 105.0),
            // Gap up: TR = |130 - 105| = 25, larger than high-low = 10.
            make_bar(2, 130.0, 120.0, 125.0),
            make_bar(3, 130.0, 120.0, 125.0),
        ];
        let series = atr(&bars, 2).unwrap();

        let expected = (10.0 + 25.0) / 2.0;
        assert!((series.value_at(1).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn atr_invalid_params() {
        let bars: Vec<Bar> = (1..=3).map(|i| make_bar(i, 110.0, 90.0, 100.0)).collect();
        assert!(atr(&bars, 0).is_err());
        assert!(matches!(
            atr(&bars, 5),
            Err(TradesimError::IndicatorWindow { period: 5, len: 3 })
        ));
    }
}
