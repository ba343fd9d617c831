//! CSV file data adapter: one `{symbol}.csv` per symbol under a base path.
//!
//! Expected columns: timestamp, open, high, low, close, volume. Timestamps
//! are `YYYY-MM-DD HH:MM:SS` or plain `YYYY-MM-DD` (read as midnight).

use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;

use crate::domain::bar::Bar;
use crate::domain::error::TradesimError;
use crate::ports::data_port::DataPort;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }

    fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }

    fn read_all(&self, symbol: &str) -> Result<Vec<Bar>, TradesimError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path)?;

        let malformed = |row: usize, raw_ts: &str, reason: String| TradesimError::DataIntegrity {
            symbol: symbol.to_string(),
            bar_index: row,
            timestamp: raw_ts.to_string(),
            reason,
        };

        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (row, result) in reader.records().enumerate() {
            let record = result.map_err(|e| malformed(row, "?", format!("CSV parse error: {e}")))?;

            let raw_ts = record
                .get(0)
                .ok_or_else(|| malformed(row, "?", "missing timestamp column".into()))?;
            let timestamp = Self::parse_timestamp(raw_ts)
                .ok_or_else(|| malformed(row, raw_ts, format!("invalid timestamp '{raw_ts}'")))?;

            let field = |index: usize, name: &str| -> Result<f64, TradesimError> {
                record
                    .get(index)
                    .ok_or_else(|| malformed(row, raw_ts, format!("missing {name} column")))?
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| malformed(row, raw_ts, format!("invalid {name} value: {e}")))
            };

            bars.push(Bar {
                symbol: symbol.to_string(),
                timestamp,
                open: field(1, "open")?,
                high: field(2, "high")?,
                low: field(3, "low")?,
                close: field(4, "close")?,
                volume: field(5, "volume")?,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, TradesimError> {
        let mut bars = self.read_all(symbol)?;
        bars.retain(|b| {
            let date = b.timestamp.date();
            date >= start_date && date <= end_date
        });
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TradesimError> {
        let mut symbols = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(symbol) = name.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }
        symbols.sort();
        Ok(symbols)
    }

    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TradesimError> {
        if !self.csv_path(symbol).exists() {
            return Ok(None);
        }
        let bars = self.read_all(symbol)?;
        match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Ok(Some((
                first.timestamp.date(),
                last.timestamp.date(),
                bars.len(),
            ))),
            _ => Ok(None),
        }
    }
}
