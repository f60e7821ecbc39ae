//! Row Reshaper: wide per-metric history to long `(date, ticker)` rows.

use super::PipelineError;
use crate::data::WidePriceTable;
use crate::domain::Metric;
use crate::schema::{cols, TableSchema};
use polars::prelude::*;
use tracing::{info, warn};

/// Unpivot one metric's sub-table into `(date, ticker, <metric>)` triples.
///
/// Null and NaN cells are skipped, so a ticker-day the provider did not price
/// is simply absent here and drops out of the inner join.
fn unpivot_metric(frame: &DataFrame, metric: Metric) -> PolarsResult<DataFrame> {
    let value_name = metric.column_name();
    let dates = frame.column(cols::DATE)?.as_materialized_series().clone();

    let mut parts = Vec::new();
    for column in frame.get_columns() {
        if column.name().as_str() == cols::DATE {
            continue;
        }
        let values = column.cast(&DataType::Float64)?;
        let keep = {
            let ca = values.f64()?;
            ca.into_iter()
                .map(|v| v.is_some_and(|x| !x.is_nan()))
                .collect::<BooleanChunked>()
        };
        let kept_values = values.as_materialized_series().filter(&keep)?;
        let kept_dates = dates.filter(&keep)?;
        let tickers = Column::new(
            cols::TICKER.into(),
            vec![column.name().as_str(); kept_values.len()],
        );

        parts.push(DataFrame::new(vec![
            Column::from(kept_dates.with_name(cols::DATE.into())),
            tickers,
            Column::from(kept_values.with_name(value_name.into())),
        ])?);
    }

    let mut parts = parts.into_iter();
    match parts.next() {
        Some(first) => parts.try_fold(first, |mut acc, part| {
            acc.vstack_mut(&part)?;
            Ok(acc)
        }),
        None => Ok(DataFrame::empty_with_schema(&Schema::from_iter([
            Field::new(cols::DATE.into(), DataType::Date),
            Field::new(cols::TICKER.into(), DataType::String),
            Field::new(value_name.into(), DataType::Float64),
        ]))),
    }
}

/// Convert a wide price table to long form with all five metrics per row.
///
/// A `(date, ticker)` pair missing from any metric is dropped entirely. A
/// table lacking a metric sub-table altogether yields no rows. Output is
/// sorted by `(date, ticker)`.
pub fn reshape_prices(wide: &WidePriceTable) -> Result<DataFrame, PipelineError> {
    let schema = TableSchema::prices();

    if wide.is_empty() {
        warn!("reshape received an empty price table");
        return Ok(TableSchema::empty(&schema));
    }

    let mut long: Option<LazyFrame> = None;
    for metric in Metric::ALL {
        let Some(frame) = wide.metric(metric) else {
            warn!(metric = metric.column_name(), "price table has no sub-table for metric");
            return Ok(TableSchema::empty(&schema));
        };
        let triples = unpivot_metric(frame, metric)?.lazy();
        long = Some(match long {
            None => triples,
            Some(acc) => acc.join(
                triples,
                [col(cols::DATE), col(cols::TICKER)],
                [col(cols::DATE), col(cols::TICKER)],
                JoinArgs::new(JoinType::Inner),
            ),
        });
    }

    let Some(long) = long else {
        return Ok(TableSchema::empty(&schema));
    };
    let names = TableSchema::column_names(&schema);
    let df = long
        .select(names.iter().map(|n| col(n.clone())).collect::<Vec<_>>())
        .sort(
            [cols::DATE, cols::TICKER],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;

    info!(rows = df.height(), tickers = wide.tickers().len(), "ticker data reshaped");
    Ok(df)
}

/// Reshape each batch and stack the results.
///
/// Batches partition the ticker set, so stacking never duplicates a key.
pub fn reshape_batches(batches: &[WidePriceTable]) -> Result<DataFrame, PipelineError> {
    let mut stacked = TableSchema::empty(&TableSchema::prices());
    for batch in batches {
        let long = reshape_prices(batch)?;
        if long.height() > 0 {
            stacked.vstack_mut(&long)?;
        }
    }

    if stacked.height() == 0 {
        return Ok(stacked);
    }
    Ok(stacked
        .lazy()
        .sort(
            [cols::DATE, cols::TICKER],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?)
}
