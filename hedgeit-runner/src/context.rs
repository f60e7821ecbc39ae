//! Explicit per-run state.
//!
//! A `RunContext` records which stages have completed and keeps the frames
//! they produced, so a later call in the same run reuses them instead of
//! fetching or recomputing. Nothing is shared between runs.

use chrono::NaiveDate;
use hedgeit_core::data::DataSource;
use hedgeit_core::pipeline::RankerConfig;
use polars::prelude::DataFrame;

#[derive(Debug, Clone)]
pub struct RunContext {
    /// Date the rolling window is anchored to.
    pub processing_date: NaiveDate,
    /// Config fingerprint, logged with every stage.
    pub run_id: String,
    /// Where the market data came from, once fetched.
    pub source: Option<DataSource>,
    /// Tickers dropped for lack of a shares record.
    pub excluded_tickers: Vec<String>,
    stocks: Option<DataFrame>,
    constituents: Option<DataFrame>,
    index: Option<DataFrame>,
    ranker: Option<RankerConfig>,
}

impl RunContext {
    pub fn new(processing_date: NaiveDate, run_id: impl Into<String>) -> Self {
        Self {
            processing_date,
            run_id: run_id.into(),
            source: None,
            excluded_tickers: Vec::new(),
            stocks: None,
            constituents: None,
            index: None,
            ranker: None,
        }
    }

    pub fn has_stocks(&self) -> bool {
        self.stocks.is_some()
    }

    pub fn has_index(&self) -> bool {
        self.constituents.is_some() && self.index.is_some()
    }

    /// Constituents and index built with exactly `ranker`, if any.
    pub fn index_built_with(&self, ranker: &RankerConfig) -> Option<(&DataFrame, &DataFrame)> {
        if self.ranker.as_ref() != Some(ranker) {
            return None;
        }
        Some((self.constituents.as_ref()?, self.index.as_ref()?))
    }

    pub fn stocks(&self) -> Option<&DataFrame> {
        self.stocks.as_ref()
    }

    pub fn constituents(&self) -> Option<&DataFrame> {
        self.constituents.as_ref()
    }

    pub fn index(&self) -> Option<&DataFrame> {
        self.index.as_ref()
    }

    /// Record the `stocks` stage. Downstream results are invalidated.
    pub fn set_stocks(&mut self, stocks: DataFrame) {
        self.stocks = Some(stocks);
        self.constituents = None;
        self.index = None;
        self.ranker = None;
    }

    pub fn set_index(&mut self, ranker: RankerConfig, constituents: DataFrame, index: DataFrame) {
        self.constituents = Some(constituents);
        self.index = Some(index);
        self.ranker = Some(ranker);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hedgeit_core::schema::TableSchema;

    #[test]
    fn new_run_has_nothing_built() {
        let ctx = RunContext::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), "abc");
        assert!(!ctx.has_stocks());
        assert!(!ctx.has_index());
        assert!(ctx.source.is_none());
    }

    #[test]
    fn new_stocks_invalidate_index() {
        let mut ctx = RunContext::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), "abc");
        ctx.set_stocks(TableSchema::empty(&TableSchema::stocks()));
        ctx.set_index(
            RankerConfig::default(),
            TableSchema::empty(&TableSchema::constituents()),
            TableSchema::empty(&TableSchema::index()),
        );
        assert!(ctx.has_index());

        ctx.set_stocks(TableSchema::empty(&TableSchema::stocks()));
        assert!(ctx.has_stocks());
        assert!(!ctx.has_index());
        assert!(ctx.index_built_with(&RankerConfig::default()).is_none());
    }

    #[test]
    fn cached_index_matches_only_its_ranker() {
        let mut ctx = RunContext::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), "abc");
        ctx.set_index(
            RankerConfig::default(),
            TableSchema::empty(&TableSchema::constituents()),
            TableSchema::empty(&TableSchema::index()),
        );

        assert!(ctx.index_built_with(&RankerConfig::default()).is_some());
        assert!(ctx.index_built_with(&RankerConfig::preview()).is_none());
        let wider = RankerConfig {
            window_days: 60,
            ..RankerConfig::default()
        };
        assert!(ctx.index_built_with(&wider).is_none());
    }
}
