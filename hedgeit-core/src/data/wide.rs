//! Wide per-metric price tables.
//!
//! Providers deliver history as one sub-table per metric: a `date` column plus
//! one Float64 column per ticker. Ticker-days a provider has no value for are
//! null in that metric's sub-table; nothing is forward-filled.

use crate::domain::{date_column, Metric, PriceBar};
use crate::schema::cols;
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A two-level (metric → ticker) wide price table keyed by date.
#[derive(Debug, Clone, Default)]
pub struct WidePriceTable {
    frames: BTreeMap<Metric, DataFrame>,
}

impl WidePriceTable {
    /// A table with no metrics at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap pre-built per-metric frames.
    ///
    /// Each frame must have a `date` column of type `Date`; every other column
    /// is read as a ticker.
    pub fn from_frames(frames: BTreeMap<Metric, DataFrame>) -> Self {
        Self { frames }
    }

    /// Assemble a wide table from per-ticker bars over the union of their dates.
    pub fn from_bars(symbol_bars: &BTreeMap<String, Vec<PriceBar>>) -> PolarsResult<Self> {
        let dates: Vec<NaiveDate> = symbol_bars
            .values()
            .flat_map(|bars| bars.iter().map(|b| b.date))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        // date → bar lookup per ticker
        let lookups: Vec<(&String, HashMap<NaiveDate, &PriceBar>)> = symbol_bars
            .iter()
            .map(|(ticker, bars)| (ticker, bars.iter().map(|b| (b.date, b)).collect()))
            .collect();

        let mut frames = BTreeMap::new();
        for metric in Metric::ALL {
            let mut columns = Vec::with_capacity(lookups.len() + 1);
            columns.push(date_column(cols::DATE, &dates)?);
            for (ticker, by_date) in &lookups {
                let values: Vec<Option<f64>> = dates
                    .iter()
                    .map(|d| by_date.get(d).and_then(|bar| metric.of(bar)))
                    .collect();
                columns.push(Column::new(ticker.as_str().into(), values));
            }
            frames.insert(metric, DataFrame::new(columns)?);
        }

        Ok(Self { frames })
    }

    /// The sub-table for a metric, if the provider delivered one.
    pub fn metric(&self, metric: Metric) -> Option<&DataFrame> {
        self.frames.get(&metric)
    }

    /// Tickers present in any metric sub-table, sorted.
    pub fn tickers(&self) -> Vec<String> {
        self.frames
            .values()
            .flat_map(|df| {
                df.get_column_names()
                    .into_iter()
                    .filter(|name| name.as_str() != cols::DATE)
                    .map(|name| name.to_string())
                    .collect::<Vec<_>>()
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of dates in the widest sub-table.
    pub fn date_count(&self) -> usize {
        self.frames.values().map(|df| df.height()).max().unwrap_or(0)
    }

    /// True when there is no ticker-day to reshape.
    pub fn is_empty(&self) -> bool {
        self.date_count() == 0 || self.tickers().is_empty()
    }
}
