//! Data provider traits and structured error types.
//!
//! Three providers feed the pipeline: a ticker lister (Polygon), a shares and
//! metadata source, and a price-history source (both Yahoo Finance). Each is a
//! trait so the HTTP implementations can be swapped for the synthetic provider
//! or for in-memory fixtures in tests.

use super::wide::WidePriceTable;
use crate::domain::SharesRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error types for data operations.
///
/// These are designed to be displayable in logs and CLI output. None of them
/// is fatal to a batch: the fan-out maps every error to an excluded key.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no data returned for {0}")]
    NoData(String),

    #[error("frame error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("data error: {0}")]
    Other(String),
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    Polygon,
    YahooFinance,
    Synthetic,
    Fixture,
}

/// A ticker as listed by the reference-data provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerListing {
    pub ticker: String,
    pub primary_exchange: String,
}

/// One page of a paginated ticker listing.
#[derive(Debug, Clone, Default)]
pub struct TickerPage {
    pub listings: Vec<TickerListing>,
    /// Opaque cursor for the next page; `None` on the last page.
    pub next: Option<String>,
}

/// Lists tickers per exchange code (e.g. `XNYS`), one page at a time.
pub trait TickerProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// First page of listings for an exchange.
    fn first_page(&self, exchange: &str) -> Result<TickerPage, DataError>;

    /// Follow a cursor returned in a previous page.
    fn next_page(&self, cursor: &str) -> Result<TickerPage, DataError>;
}

/// Supplies a shares-outstanding snapshot per ticker.
pub trait SharesProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Shares and metadata for one ticker.
    ///
    /// `Ok(None)` means the provider answered but lacked a required field; the
    /// ticker is excluded downstream.
    fn shares(&self, ticker: &str) -> Result<Option<SharesRecord>, DataError>;
}

/// Supplies trailing daily price history for a batch of tickers.
pub trait PriceHistoryProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Wide per-metric history covering the last `period_days` days.
    fn history(&self, tickers: &[String], period_days: u32) -> Result<WidePriceTable, DataError>;
}
