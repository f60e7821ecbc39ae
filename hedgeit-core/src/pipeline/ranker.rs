//! Top-N Ranker: the N largest tickers by market cap per date.

use super::PipelineError;
use crate::schema::{cols, TableSchema};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Constituents per date in a full index build.
pub const DEFAULT_TOP_N: usize = 100;
/// Constituents per date in the preview build.
pub const PREVIEW_TOP_N: usize = 2;
/// Trailing window, in calendar days, kept before ranking.
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Ranking parameters. Each entry point passes its own; nothing is hard-coded here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankerConfig {
    pub top_n: usize,
    pub window_days: i64,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

impl RankerConfig {
    pub fn preview() -> Self {
        Self {
            top_n: PREVIEW_TOP_N,
            ..Self::default()
        }
    }

    /// Earliest date kept for a run processed on `processing_date`.
    pub fn window_start(&self, processing_date: NaiveDate) -> NaiveDate {
        processing_date - chrono::Duration::days(self.window_days)
    }
}

/// Keep rows dated on or after the window start, then the first `top_n` per date
/// ordered by market cap descending. Ties go to the alphabetically first ticker.
///
/// Output columns follow the constituent schema, sorted by date ascending,
/// market cap descending, ticker ascending.
pub fn rank_top_n(
    stocks: &DataFrame,
    config: &RankerConfig,
    processing_date: NaiveDate,
) -> Result<DataFrame, PipelineError> {
    let schema = TableSchema::constituents();
    if stocks.height() == 0 {
        return Err(PipelineError::EmptyInput { stage: "top-n ranker" });
    }
    TableSchema::validate(stocks, &TableSchema::stocks())?;
    if config.top_n == 0 {
        return Ok(TableSchema::empty(&schema));
    }

    let window_start = config.window_start(processing_date);
    let ordering = SortMultipleOptions::default()
        .with_order_descending_multi([false, true, false])
        .with_maintain_order(true);
    let columns: Vec<Expr> = TableSchema::column_names(&schema)
        .into_iter()
        .map(col)
        .collect();

    let ranked = stocks
        .clone()
        .lazy()
        .filter(col(cols::DATE).gt_eq(lit(window_start)))
        .sort([cols::DATE, cols::MARKET_CAP, cols::TICKER], ordering.clone())
        .group_by_stable([col(cols::DATE)])
        .head(Some(config.top_n))
        .select(columns)
        .sort([cols::DATE, cols::MARKET_CAP, cols::TICKER], ordering)
        .collect()?;

    info!(
        rows = ranked.height(),
        top_n = config.top_n,
        window_start = %window_start,
        "top market caps ranked"
    );
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConstituentRow, StockRow};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    fn stock(date: NaiveDate, ticker: &str, close: f64, shares: f64) -> StockRow {
        StockRow {
            date,
            ticker: ticker.into(),
            open: close,
            close,
            low: close,
            high: close,
            volume: 1.0,
            shares_outstanding: shares,
            industry: None,
            sector: None,
            display_name: ticker.into(),
            market_cap: close * shares,
        }
    }

    fn ranked(rows: &[StockRow], config: RankerConfig, today: NaiveDate) -> Vec<ConstituentRow> {
        let df = StockRow::to_frame(rows).unwrap();
        ConstituentRow::from_frame(&rank_top_n(&df, &config, today).unwrap()).unwrap()
    }

    #[test]
    fn keeps_top_n_per_date_by_market_cap() {
        let rows = vec![
            stock(day(1), "A", 100.0, 1e6),
            stock(day(1), "B", 300.0, 5e5),
            stock(day(1), "C", 50.0, 1e7),
            stock(day(2), "A", 100.0, 1e6),
        ];

        let out = ranked(&rows, RankerConfig::preview(), day(10));

        let keys: Vec<(NaiveDate, &str)> = out.iter().map(|r| (r.date, r.ticker.as_str())).collect();
        assert_eq!(keys, vec![(day(1), "C"), (day(1), "B"), (day(2), "A")]);
    }

    #[test]
    fn window_excludes_older_rows() {
        let today = day(29);
        let rows = vec![
            stock(NaiveDate::from_ymd_opt(2024, 1, 29).unwrap(), "OLD", 1.0, 1.0),
            stock(NaiveDate::from_ymd_opt(2024, 1, 30).unwrap(), "EDGE", 1.0, 1.0),
            stock(day(28), "NEW", 1.0, 1.0),
        ];

        let out = ranked(&rows, RankerConfig::default(), today);

        let tickers: Vec<&str> = out.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["EDGE", "NEW"]);
    }

    #[test]
    fn ties_go_to_ticker_ascending() {
        let rows = vec![
            stock(day(1), "ZED", 10.0, 10.0),
            stock(day(1), "ABE", 10.0, 10.0),
            stock(day(1), "MID", 10.0, 10.0),
        ];

        let config = RankerConfig {
            top_n: 2,
            window_days: 30,
        };
        let out = ranked(&rows, config, day(2));

        let tickers: Vec<&str> = out.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["ABE", "MID"]);
    }

    #[test]
    fn fewer_than_n_keeps_all() {
        let rows = vec![stock(day(1), "A", 1.0, 1.0)];
        let out = ranked(&rows, RankerConfig::default(), day(2));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn empty_stocks_is_no_data() {
        let df = TableSchema::empty(&TableSchema::stocks());
        let err = rank_top_n(&df, &RankerConfig::default(), day(1)).unwrap_err();
        assert!(err.is_empty_input());
    }
}
