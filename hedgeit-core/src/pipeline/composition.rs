//! Composition Reporter: each constituent alongside its date's index level.

use super::PipelineError;
use crate::schema::{cols, TableSchema};
use polars::prelude::*;

/// Left-join constituents with index rows on date and add
/// `value = close / stock_count`.
///
/// Constituents whose date has no index row keep null `stock_count`,
/// `index_value`, and `value`. An empty constituent table gives an empty
/// composition.
pub fn index_composition(constituents: &DataFrame, index: &DataFrame) -> Result<DataFrame, PipelineError> {
    let schema = TableSchema::composition();
    if constituents.height() == 0 {
        return Ok(TableSchema::empty(&schema));
    }
    TableSchema::validate(constituents, &TableSchema::constituents())?;
    TableSchema::validate(index, &TableSchema::index())?;

    let index = index
        .clone()
        .lazy()
        .select([col(cols::DATE), col(cols::STOCK_COUNT), col(cols::INDEX_VALUE)]);

    let composition = constituents
        .clone()
        .lazy()
        .join(
            index,
            [col(cols::DATE)],
            [col(cols::DATE)],
            JoinArgs::new(JoinType::Left),
        )
        .with_column((col(cols::CLOSE) / col(cols::STOCK_COUNT).cast(DataType::Float64)).alias(cols::VALUE))
        .select(
            TableSchema::column_names(&schema)
                .into_iter()
                .map(col)
                .collect::<Vec<_>>(),
        )
        .sort(
            [cols::DATE, cols::MARKET_CAP, cols::TICKER],
            SortMultipleOptions::default()
                .with_order_descending_multi([false, true, false])
                .with_maintain_order(true),
        )
        .collect()?;

    Ok(composition)
}
