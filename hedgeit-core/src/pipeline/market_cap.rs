//! Market Cap Joiner: prices ⋈ shares on ticker.

use super::PipelineError;
use crate::schema::{cols, TableSchema};
use polars::prelude::*;
use tracing::info;

/// Inner-join long prices with the shares snapshot and compute
/// `market_cap = shares_outstanding × close`.
///
/// Shares are de-duplicated by ticker (first record wins) so each price row
/// joins at most once. Either side empty is [`PipelineError::EmptyInput`].
pub fn compute_market_cap(prices: &DataFrame, shares: &DataFrame) -> Result<DataFrame, PipelineError> {
    info!(
        prices = prices.height(),
        shares = shares.height(),
        "computing market cap"
    );
    if prices.height() == 0 || shares.height() == 0 {
        return Err(PipelineError::EmptyInput {
            stage: "market cap joiner",
        });
    }
    TableSchema::validate(prices, &TableSchema::prices())?;
    TableSchema::validate(shares, &TableSchema::shares())?;

    let shares = shares
        .clone()
        .lazy()
        .unique_stable(Some(vec![cols::TICKER.into()]), UniqueKeepStrategy::First);

    let schema = TableSchema::stocks();
    let stocks = prices
        .clone()
        .lazy()
        .join(
            shares,
            [col(cols::TICKER)],
            [col(cols::TICKER)],
            JoinArgs::new(JoinType::Inner),
        )
        .with_column((col(cols::SHARES_OUTSTANDING) * col(cols::CLOSE)).alias(cols::MARKET_CAP))
        .select(
            TableSchema::column_names(&schema)
                .into_iter()
                .map(col)
                .collect::<Vec<_>>(),
        )
        .sort(
            [cols::DATE, cols::TICKER],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;

    info!(rows = stocks.height(), "market cap computed");
    Ok(stocks)
}
