//! Fan-out fetcher: bounded worker pool, one task per key, gather barrier.
//!
//! Network-bound provider calls run on a private rayon pool so they never
//! compete with Polars for the global pool. A key whose task fails or yields
//! nothing is recorded as excluded; errors never escape the gather step.

use super::provider::{DataError, PriceHistoryProvider, SharesProvider, TickerProvider};
use super::universe::tickers_by_exchange;
use super::wide::WidePriceTable;
use crate::domain::SharesRecord;
use polars::prelude::DataFrame;
use rayon::prelude::*;
use std::fmt::Display;
use tracing::{error, info, warn};

/// Worker count used when none is configured: ten per available core.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        * 10
}

/// Results of a fan-out, in key order.
#[derive(Debug)]
pub struct Gathered<K, V> {
    pub values: Vec<(K, V)>,
    pub excluded: Vec<K>,
}

/// Bounded fan-out over a private thread pool.
#[derive(Debug, Clone, Copy)]
pub struct FanOut {
    pub workers: usize,
}

impl Default for FanOut {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

impl FanOut {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Run `task` once per key and wait for all of them.
    pub fn run<K, V, F>(&self, keys: &[K], task: F) -> Gathered<K, V>
    where
        K: Clone + Display + Send + Sync,
        V: Send,
        F: Fn(&K) -> Result<Option<V>, DataError> + Sync,
    {
        let call = |key: &K| match task(key) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => {
                warn!(key = %key, "no usable data, excluding");
                Err(key.clone())
            }
            Err(e) => {
                error!(key = %key, error = %e, "task failed, excluding");
                Err(key.clone())
            }
        };

        let outcomes: Vec<(K, Result<V, K>)> = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
        {
            Ok(pool) => pool.install(|| keys.par_iter().map(|k| (k.clone(), call(k))).collect()),
            Err(e) => {
                warn!(error = %e, "failed to build worker pool, running sequentially");
                keys.iter().map(|k| (k.clone(), call(k))).collect()
            }
        };

        let mut gathered = Gathered {
            values: Vec::with_capacity(outcomes.len()),
            excluded: Vec::new(),
        };
        for (key, outcome) in outcomes {
            match outcome {
                Ok(value) => gathered.values.push((key, value)),
                Err(excluded) => gathered.excluded.push(excluded),
            }
        }
        gathered
    }
}

/// Knobs for a market-data fetch.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub exchanges: Vec<String>,
    pub stock_limit: usize,
    pub chunk_size: usize,
    pub history_days: u32,
    pub workers: usize,
}

/// Everything the pipeline needs from the providers.
#[derive(Debug)]
pub struct MarketData {
    /// `shares` frame, one row per ticker.
    pub shares: DataFrame,
    /// Wide price history, one table per ticker batch.
    pub prices: Vec<WidePriceTable>,
    /// Tickers listed before the stock limit was applied.
    pub listed: usize,
    /// Tickers dropped because no shares record was available.
    pub excluded_tickers: Vec<String>,
    /// Batches that returned no history.
    pub excluded_batches: usize,
}

/// A labelled slice of tickers, so excluded batches log readably.
#[derive(Debug, Clone)]
struct TickerBatch {
    index: usize,
    tickers: Vec<String>,
}

impl Display for TickerBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "batch#{} ({} tickers)", self.index, self.tickers.len())
    }
}

/// List tickers, fetch shares per ticker, then history per batch of tickers
/// that have shares.
pub fn fetch_market_data(
    ticker_provider: &dyn TickerProvider,
    shares_provider: &dyn SharesProvider,
    history_provider: &dyn PriceHistoryProvider,
    settings: &FetchSettings,
) -> Result<MarketData, DataError> {
    let universe = tickers_by_exchange(ticker_provider, &settings.exchanges);
    let tickers = universe.tickers(settings.stock_limit);
    info!(
        listed = universe.len(),
        selected = tickers.len(),
        "ticker universe ready"
    );

    let fan_out = FanOut::new(settings.workers);

    let shares = fan_out.run(&tickers, |ticker| shares_provider.shares(ticker));
    let records: Vec<SharesRecord> = shares.values.into_iter().map(|(_, r)| r).collect();
    let with_shares: Vec<String> = records.iter().map(|r| r.ticker.clone()).collect();
    info!(
        fetched = records.len(),
        excluded = shares.excluded.len(),
        "shares snapshot fetched"
    );

    let batches: Vec<TickerBatch> = with_shares
        .chunks(settings.chunk_size.max(1))
        .enumerate()
        .map(|(index, chunk)| TickerBatch {
            index,
            tickers: chunk.to_vec(),
        })
        .collect();

    let history = fan_out.run(&batches, |batch| {
        info!(batch = %batch, "fetching price history");
        history_provider
            .history(&batch.tickers, settings.history_days)
            .map(Some)
    });
    info!(
        batches = batches.len(),
        excluded = history.excluded.len(),
        "price history fetched"
    );

    Ok(MarketData {
        shares: SharesRecord::to_frame(&records)?,
        prices: history.values.into_iter().map(|(_, t)| t).collect(),
        listed: universe.len(),
        excluded_tickers: shares.excluded,
        excluded_batches: history.excluded.len(),
    })
}
