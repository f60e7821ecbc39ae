//! Price data: per-ticker bars from providers and long-form observations.

use super::{read_dates, read_f64, read_strings, required};
use crate::schema::cols;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// One of the five daily price metrics carried by a wide price table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Metric {
    Open,
    Close,
    Low,
    High,
    Volume,
}

impl Metric {
    /// All metrics, in reshape order.
    pub const ALL: [Metric; 5] = [
        Metric::Open,
        Metric::Close,
        Metric::Low,
        Metric::High,
        Metric::Volume,
    ];

    /// Column name of this metric in long-form tables.
    pub fn column_name(self) -> &'static str {
        match self {
            Metric::Open => cols::OPEN,
            Metric::Close => cols::CLOSE,
            Metric::Low => cols::LOW,
            Metric::High => cols::HIGH,
            Metric::Volume => cols::VOLUME,
        }
    }

    /// Pick this metric's value out of a bar.
    pub fn of(self, bar: &PriceBar) -> Option<f64> {
        match self {
            Metric::Open => bar.open,
            Metric::Close => bar.close,
            Metric::Low => bar.low,
            Metric::High => bar.high,
            Metric::Volume => bar.volume,
        }
    }
}

/// Daily bar for one ticker as delivered by a price provider.
///
/// Each metric may be missing independently; providers report gaps as `None`
/// rather than NaN so the reshaper can drop partial ticker-days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl PriceBar {
    /// A bar with every metric present.
    pub fn complete(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(volume),
        }
    }

    /// True when every metric is missing (holidays in the provider's calendar).
    pub fn is_void(&self) -> bool {
        Metric::ALL.iter().all(|m| m.of(self).is_none())
    }
}

/// One long-form price row: a ticker on a trading day with all five metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub date: NaiveDate,
    pub ticker: String,
    pub open: f64,
    pub close: f64,
    pub low: f64,
    pub high: f64,
    pub volume: f64,
}

impl PriceObservation {
    pub fn from_frame(df: &DataFrame) -> PolarsResult<Vec<Self>> {
        let dates = read_dates(df, cols::DATE)?;
        let tickers = read_strings(df, cols::TICKER)?;
        let opens = read_f64(df, cols::OPEN)?;
        let closes = read_f64(df, cols::CLOSE)?;
        let lows = read_f64(df, cols::LOW)?;
        let highs = read_f64(df, cols::HIGH)?;
        let volumes = read_f64(df, cols::VOLUME)?;

        (0..df.height())
            .map(|i| {
                Ok(Self {
                    date: dates[i],
                    ticker: required(tickers[i].clone(), cols::TICKER, i)?,
                    open: required(opens[i], cols::OPEN, i)?,
                    close: required(closes[i], cols::CLOSE, i)?,
                    low: required(lows[i], cols::LOW, i)?,
                    high: required(highs[i], cols::HIGH, i)?,
                    volume: required(volumes[i], cols::VOLUME, i)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn void_bar_detection() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let void = PriceBar {
            date,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: None,
        };
        assert!(void.is_void());

        let partial = PriceBar {
            close: Some(10.0),
            ..void
        };
        assert!(!partial.is_void());
    }

    #[test]
    fn metric_column_names_are_distinct() {
        let mut names: Vec<&str> = Metric::ALL.iter().map(|m| m.column_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 5);
    }
}
