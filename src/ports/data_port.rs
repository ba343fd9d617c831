//! Market data access port trait.
//!
//! Data acquisition is an external collaborator's concern; the engine only
//! requires fully materialized, timestamp-ordered bars.

use chrono::NaiveDate;

use crate::domain::bar::Bar;
use crate::domain::error::TradesimError;

pub trait DataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, TradesimError>;

    fn list_symbols(&self) -> Result<Vec<String>, TradesimError>;

    /// (first timestamp's date, last timestamp's date, bar count) if any data exists.
    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TradesimError>;
}
