//! Index pipeline stages.
//!
//! Row Reshaper → Market Cap Joiner → Top-N Ranker → Index Aggregator →
//! Composition Reporter. Each stage takes materialised frames, builds a lazy
//! query, and collects before returning, so stages can be persisted and rerun
//! independently. None of them has side effects.

pub mod composition;
pub mod index;
pub mod market_cap;
pub mod ranker;
pub mod reshape;

pub use composition::index_composition;
pub use index::equal_weighted_index;
pub use market_cap::compute_market_cap;
pub use ranker::{rank_top_n, RankerConfig, DEFAULT_TOP_N, DEFAULT_WINDOW_DAYS, PREVIEW_TOP_N};
pub use reshape::{reshape_batches, reshape_prices};

use crate::schema::SchemaError;
use thiserror::Error;

/// Errors raised by pipeline stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage received no rows; callers persist an empty table and move on.
    #[error("no data: {stage} received an empty input")]
    EmptyInput { stage: &'static str },

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("frame error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}

impl PipelineError {
    /// True for the "no data" condition rather than a real failure.
    pub fn is_empty_input(&self) -> bool {
        matches!(self, PipelineError::EmptyInput { .. })
    }
}
