//! Domain types for the hedge-it index pipeline.
//!
//! The pipeline itself works on Polars frames; these structs are the typed view
//! of each table, used by providers to build frames and by the presentation
//! layer to read them back.

pub mod index;
pub mod price;
pub mod shares;

pub use index::{CompositionRow, ConstituentRow, IndexRow, StockRow};
pub use price::{Metric, PriceBar, PriceObservation};
pub use shares::SharesRecord;

use chrono::NaiveDate;
use polars::prelude::*;

/// Ticker symbol type alias
pub type Ticker = String;

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

/// Days since 1970-01-01, the physical representation of a Polars `Date`.
pub fn days_since_epoch(date: NaiveDate) -> i32 {
    (date - epoch()).num_days() as i32
}

/// Inverse of [`days_since_epoch`].
pub fn date_from_days(days: i32) -> NaiveDate {
    epoch() + chrono::Duration::days(days as i64)
}

/// Build a `Date` column from chrono dates.
pub fn date_column(name: &str, dates: &[NaiveDate]) -> PolarsResult<Column> {
    let days: Vec<i32> = dates.iter().map(|d| days_since_epoch(*d)).collect();
    Column::new(name.into(), days).cast(&DataType::Date)
}

/// Read a `Date` column back into chrono dates (nulls are an error).
pub(crate) fn read_dates(df: &DataFrame, name: &str) -> PolarsResult<Vec<NaiveDate>> {
    let ca = df.column(name)?.date()?;
    (0..df.height())
        .map(|i| {
            ca.get(i)
                .map(date_from_days)
                .ok_or_else(|| polars_err!(ComputeError: "null date in column '{}' at row {}", name, i))
        })
        .collect()
}

pub(crate) fn read_strings(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let ca = df.column(name)?.str()?;
    Ok((0..df.height()).map(|i| ca.get(i).map(str::to_string)).collect())
}

pub(crate) fn read_f64(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let ca = df.column(name)?.f64()?;
    Ok((0..df.height()).map(|i| ca.get(i)).collect())
}

pub(crate) fn read_u32(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<u32>>> {
    let ca = df.column(name)?.u32()?;
    Ok((0..df.height()).map(|i| ca.get(i)).collect())
}

pub(crate) fn required<T>(value: Option<T>, column: &str, row: usize) -> PolarsResult<T> {
    value.ok_or_else(|| polars_err!(ComputeError: "null value in column '{}' at row {}", column, row))
}
