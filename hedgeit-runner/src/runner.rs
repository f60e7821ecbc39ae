//! Index runner: wires providers, pipeline stages, and the table store.
//!
//! Three entry points:
//! - `build_data()`: fetch market data, reshape, join market caps, persist `stocks`.
//! - `build_index()`: rank, aggregate, persist `top_mcap` and `index`.
//! - `run_pipeline()`: both, in order, with a fresh `RunContext`.
//!
//! `load_outputs()` reads a previous run back from the store without fetching.

use chrono::NaiveDate;
use polars::prelude::*;
use thiserror::Error;
use tracing::{error, info, warn};

use hedgeit_core::data::{
    fetch_market_data, DataError, DataSource, PriceHistoryProvider, SharesProvider,
    SyntheticProvider, TickerProvider,
};
use hedgeit_core::domain::{CompositionRow, ConstituentRow, IndexRow};
use hedgeit_core::pipeline::{
    compute_market_cap, equal_weighted_index, index_composition, rank_top_n, reshape_batches,
    PipelineError, RankerConfig,
};
use hedgeit_core::schema::{cols, tables, TableSchema};
use hedgeit_core::store::{StoreError, TableMeta, TableStore};

use crate::config::{ConfigError, IndexConfig};
use crate::context::RunContext;
use crate::metrics::IndexMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<PolarsError> for RunError {
    fn from(e: PolarsError) -> Self {
        RunError::Pipeline(PipelineError::Polars(e))
    }
}

/// The three data sources a build draws from.
#[derive(Clone, Copy)]
pub struct Providers<'a> {
    pub tickers: &'a dyn TickerProvider,
    pub shares: &'a dyn SharesProvider,
    pub history: &'a dyn PriceHistoryProvider,
    pub source: DataSource,
}

impl<'a> Providers<'a> {
    pub fn synthetic(provider: &'a SyntheticProvider) -> Self {
        Self {
            tickers: provider,
            shares: provider,
            history: provider,
            source: DataSource::Synthetic,
        }
    }
}

/// Frames produced by an index build, plus the metadata of what was persisted.
#[derive(Debug, Clone)]
pub struct IndexOutputs {
    pub constituents: DataFrame,
    pub index: DataFrame,
    pub composition: DataFrame,
    pub tables: Vec<TableMeta>,
}

impl IndexOutputs {
    pub fn index_rows(&self) -> PolarsResult<Vec<IndexRow>> {
        IndexRow::from_frame(&self.index)
    }

    pub fn constituent_rows(&self) -> PolarsResult<Vec<ConstituentRow>> {
        ConstituentRow::from_frame(&self.constituents)
    }

    /// Composition rows for one date, largest market cap first.
    pub fn composition_on(&self, date: NaiveDate) -> PolarsResult<Vec<CompositionRow>> {
        CompositionRow::from_frame(&self.composition_frame_on(date)?)
    }

    /// Composition for a date as a frame, for export.
    pub fn composition_frame_on(&self, date: NaiveDate) -> PolarsResult<DataFrame> {
        self.composition
            .clone()
            .lazy()
            .filter(col(cols::DATE).eq(lit(date)))
            .collect()
    }

    /// First index date, the default selection for composition views.
    pub fn first_date(&self) -> PolarsResult<Option<NaiveDate>> {
        Ok(self.index_rows()?.first().map(|r| r.date))
    }

    pub fn metrics(&self) -> PolarsResult<IndexMetrics> {
        Ok(IndexMetrics::compute(&self.index_rows()?, &self.constituent_rows()?))
    }
}

/// Treat an empty-input stage as "no data": log it and carry an empty table.
fn or_empty(result: Result<DataFrame, PipelineError>, schema: Schema) -> Result<DataFrame, RunError> {
    match result {
        Ok(df) => Ok(df),
        Err(e) if e.is_empty_input() => {
            error!(error = %e, "no data, persisting an empty table");
            Ok(TableSchema::empty(&schema))
        }
        Err(e) => Err(e.into()),
    }
}

/// Fetch, reshape, join market caps, and persist the `stocks` table.
///
/// Reuses the context's `stocks` if this run already built them.
pub fn build_data(
    ctx: &mut RunContext,
    config: &IndexConfig,
    providers: Providers<'_>,
    store: &TableStore,
) -> Result<TableMeta, RunError> {
    info!(
        run_id = %ctx.run_id,
        stock_limit = config.stock_limit,
        chunk_size = config.chunk_size,
        exchanges = ?config.exchanges,
        source = ?providers.source,
        "building data"
    );
    if ctx.has_stocks() {
        info!("stocks already built in this run, reusing");
        return Ok(store.meta(tables::STOCKS)?);
    }

    let market = fetch_market_data(
        providers.tickers,
        providers.shares,
        providers.history,
        &config.fetch_settings(),
    )?;
    if !market.excluded_tickers.is_empty() {
        warn!(count = market.excluded_tickers.len(), "tickers excluded for missing shares data");
    }
    if market.excluded_batches > 0 {
        warn!(count = market.excluded_batches, "price batches returned no history");
    }

    let prices = reshape_batches(&market.prices)?;
    let stocks = or_empty(compute_market_cap(&prices, &market.shares), TableSchema::stocks())?;

    let meta = store.replace(tables::STOCKS, &stocks)?;
    info!(
        rows = meta.rows,
        hash = %meta.content_hash,
        "stocks persisted"
    );

    ctx.source = Some(providers.source);
    ctx.excluded_tickers = market.excluded_tickers;
    ctx.set_stocks(stocks);
    Ok(meta)
}

/// Rank, aggregate, and persist `top_mcap` and `index`; return the composition too.
///
/// Reads `stocks` from the context, or from the store when this run did not
/// build them (rebuilding an index from a previous fetch).
pub fn build_index(
    ctx: &mut RunContext,
    ranker: &RankerConfig,
    store: &TableStore,
) -> Result<IndexOutputs, RunError> {
    if let Some((constituents, index)) = ctx.index_built_with(ranker) {
        info!("index already built in this run with these settings, reusing");
        let composition = index_composition(constituents, index)?;
        return Ok(IndexOutputs {
            constituents: constituents.clone(),
            index: index.clone(),
            composition,
            tables: vec![store.meta(tables::TOP_MCAP)?, store.meta(tables::INDEX)?],
        });
    }

    let stocks = match ctx.stocks() {
        Some(stocks) => stocks.clone(),
        None => store.read(tables::STOCKS)?,
    };
    info!(
        run_id = %ctx.run_id,
        top_n = ranker.top_n,
        window_days = ranker.window_days,
        processing_date = %ctx.processing_date,
        "creating custom index"
    );

    let constituents = or_empty(
        rank_top_n(&stocks, ranker, ctx.processing_date),
        TableSchema::constituents(),
    )?;
    let top_meta = store.replace(tables::TOP_MCAP, &constituents)?;

    let index = or_empty(equal_weighted_index(&constituents), TableSchema::index())?;
    let index_meta = store.replace(tables::INDEX, &index)?;
    info!(
        constituents = top_meta.rows,
        dates = index_meta.rows,
        "index persisted"
    );

    let composition = index_composition(&constituents, &index)?;
    ctx.set_index(*ranker, constituents.clone(), index.clone());

    Ok(IndexOutputs {
        constituents,
        index,
        composition,
        tables: vec![top_meta, index_meta],
    })
}

/// Full run: data, then index, against a fresh context.
pub fn run_pipeline(
    config: &IndexConfig,
    providers: Providers<'_>,
    store: &TableStore,
    processing_date: NaiveDate,
) -> Result<(RunContext, IndexOutputs), RunError> {
    config.validate()?;
    let mut ctx = RunContext::new(processing_date, config.fingerprint());

    let stocks_meta = build_data(&mut ctx, config, providers, store)?;
    let mut outputs = build_index(&mut ctx, &config.ranker(), store)?;
    outputs.tables.insert(0, stocks_meta);

    info!(run_id = %ctx.run_id, "pipeline completed");
    Ok((ctx, outputs))
}

/// Read the last build back from the store.
pub fn load_outputs(store: &TableStore) -> Result<IndexOutputs, RunError> {
    let constituents = store.read(tables::TOP_MCAP)?;
    let index = store.read(tables::INDEX)?;
    let composition = index_composition(&constituents, &index)?;
    Ok(IndexOutputs {
        constituents,
        index,
        composition,
        tables: vec![store.meta(tables::TOP_MCAP)?, store.meta(tables::INDEX)?],
    })
}
