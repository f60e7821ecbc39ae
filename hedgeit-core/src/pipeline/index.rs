//! Index Aggregator: equal-weighted index level per date.

use super::PipelineError;
use crate::schema::{cols, TableSchema};
use polars::prelude::*;
use tracing::info;

/// Per date: `stock_count = k` and `index_value = Σ (close / k)`.
///
/// Rows are put in `(date, ticker)` order first so the floating-point sum is
/// reproducible regardless of how the constituents arrived. Dates with no
/// constituents produce no row.
pub fn equal_weighted_index(constituents: &DataFrame) -> Result<DataFrame, PipelineError> {
    if constituents.height() == 0 {
        return Err(PipelineError::EmptyInput {
            stage: "index aggregator",
        });
    }
    TableSchema::validate(constituents, &TableSchema::constituents())?;

    let index = constituents
        .clone()
        .lazy()
        .sort(
            [cols::DATE, cols::TICKER],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .with_column(
            len()
                .over([col(cols::DATE)])
                .cast(DataType::UInt32)
                .alias(cols::STOCK_COUNT),
        )
        .with_column((col(cols::CLOSE) / col(cols::STOCK_COUNT).cast(DataType::Float64)).alias(cols::VALUE))
        .group_by_stable([col(cols::DATE)])
        .agg([
            col(cols::STOCK_COUNT).first(),
            col(cols::VALUE).sum().alias(cols::INDEX_VALUE),
        ])
        .sort([cols::DATE], SortMultipleOptions::default())
        .collect()?;

    info!(dates = index.height(), "index computed");
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConstituentRow, IndexRow};
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    fn member(date: NaiveDate, ticker: &str, close: f64) -> ConstituentRow {
        ConstituentRow {
            date,
            ticker: ticker.into(),
            display_name: ticker.into(),
            sector: None,
            market_cap: close * 1000.0,
            close,
        }
    }

    fn index_of(rows: &[ConstituentRow]) -> Vec<IndexRow> {
        let df = ConstituentRow::to_frame(rows).unwrap();
        let out = equal_weighted_index(&df).unwrap();
        TableSchema::validate(&out, &TableSchema::index()).unwrap();
        IndexRow::from_frame(&out).unwrap()
    }

    #[test]
    fn mean_close_per_date() {
        let out = index_of(&[
            member(day(1), "A", 100.0),
            member(day(1), "B", 300.0),
            member(day(2), "A", 90.0),
        ]);

        assert_eq!(
            out,
            vec![
                IndexRow {
                    date: day(1),
                    stock_count: 2,
                    index_value: 200.0
                },
                IndexRow {
                    date: day(2),
                    stock_count: 1,
                    index_value: 90.0
                },
            ]
        );
    }

    #[test]
    fn input_order_does_not_matter() {
        let forward = index_of(&[
            member(day(1), "A", 0.1),
            member(day(1), "B", 0.2),
            member(day(1), "C", 0.3),
        ]);
        let reverse = index_of(&[
            member(day(1), "C", 0.3),
            member(day(1), "B", 0.2),
            member(day(1), "A", 0.1),
        ]);
        assert_eq!(forward, reverse);
    }

    #[test]
    fn dates_sorted_ascending() {
        let out = index_of(&[member(day(3), "A", 1.0), member(day(1), "A", 2.0)]);
        assert_eq!(out[0].date, day(1));
        assert_eq!(out[1].date, day(3));
    }

    #[test]
    fn empty_constituents_is_no_data() {
        let df = TableSchema::empty(&TableSchema::constituents());
        assert!(equal_weighted_index(&df).unwrap_err().is_empty_input());
    }
}
