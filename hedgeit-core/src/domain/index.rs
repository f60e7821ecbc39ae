//! Typed rows of the stock, constituent, index, and composition tables.

use super::{date_column, read_dates, read_f64, read_strings, read_u32, required};
use crate::schema::cols;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// A price observation joined with its shares snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRow {
    pub date: NaiveDate,
    pub ticker: String,
    pub open: f64,
    pub close: f64,
    pub low: f64,
    pub high: f64,
    pub volume: f64,
    pub shares_outstanding: f64,
    pub industry: Option<String>,
    pub sector: Option<String>,
    pub display_name: String,
    pub market_cap: f64,
}

impl StockRow {
    pub fn to_frame(rows: &[StockRow]) -> PolarsResult<DataFrame> {
        let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
        DataFrame::new(vec![
            date_column(cols::DATE, &dates)?,
            Column::new(cols::TICKER.into(), rows.iter().map(|r| r.ticker.as_str()).collect::<Vec<_>>()),
            Column::new(cols::OPEN.into(), rows.iter().map(|r| r.open).collect::<Vec<_>>()),
            Column::new(cols::CLOSE.into(), rows.iter().map(|r| r.close).collect::<Vec<_>>()),
            Column::new(cols::LOW.into(), rows.iter().map(|r| r.low).collect::<Vec<_>>()),
            Column::new(cols::HIGH.into(), rows.iter().map(|r| r.high).collect::<Vec<_>>()),
            Column::new(cols::VOLUME.into(), rows.iter().map(|r| r.volume).collect::<Vec<_>>()),
            Column::new(
                cols::SHARES_OUTSTANDING.into(),
                rows.iter().map(|r| r.shares_outstanding).collect::<Vec<_>>(),
            ),
            Column::new(
                cols::INDUSTRY.into(),
                rows.iter().map(|r| r.industry.as_deref()).collect::<Vec<_>>(),
            ),
            Column::new(
                cols::SECTOR.into(),
                rows.iter().map(|r| r.sector.as_deref()).collect::<Vec<_>>(),
            ),
            Column::new(
                cols::DISPLAY_NAME.into(),
                rows.iter().map(|r| r.display_name.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(cols::MARKET_CAP.into(), rows.iter().map(|r| r.market_cap).collect::<Vec<_>>()),
        ])
    }

    pub fn from_frame(df: &DataFrame) -> PolarsResult<Vec<Self>> {
        let dates = read_dates(df, cols::DATE)?;
        let tickers = read_strings(df, cols::TICKER)?;
        let opens = read_f64(df, cols::OPEN)?;
        let closes = read_f64(df, cols::CLOSE)?;
        let lows = read_f64(df, cols::LOW)?;
        let highs = read_f64(df, cols::HIGH)?;
        let volumes = read_f64(df, cols::VOLUME)?;
        let shares = read_f64(df, cols::SHARES_OUTSTANDING)?;
        let industries = read_strings(df, cols::INDUSTRY)?;
        let sectors = read_strings(df, cols::SECTOR)?;
        let names = read_strings(df, cols::DISPLAY_NAME)?;
        let caps = read_f64(df, cols::MARKET_CAP)?;

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
                    shares_outstanding: required(shares[i], cols::SHARES_OUTSTANDING, i)?,
                    industry: industries[i].clone(),
                    sector: sectors[i].clone(),
                    display_name: required(names[i].clone(), cols::DISPLAY_NAME, i)?,
                    market_cap: required(caps[i], cols::MARKET_CAP, i)?,
                })
            })
            .collect()
    }
}

/// A ticker retained in the top-N ranking for a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstituentRow {
    pub date: NaiveDate,
    pub ticker: String,
    pub display_name: String,
    pub sector: Option<String>,
    pub market_cap: f64,
    pub close: f64,
}

impl ConstituentRow {
    pub fn to_frame(rows: &[ConstituentRow]) -> PolarsResult<DataFrame> {
        let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
        DataFrame::new(vec![
            date_column(cols::DATE, &dates)?,
            Column::new(cols::TICKER.into(), rows.iter().map(|r| r.ticker.as_str()).collect::<Vec<_>>()),
            Column::new(
                cols::DISPLAY_NAME.into(),
                rows.iter().map(|r| r.display_name.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                cols::SECTOR.into(),
                rows.iter().map(|r| r.sector.as_deref()).collect::<Vec<_>>(),
            ),
            Column::new(cols::MARKET_CAP.into(), rows.iter().map(|r| r.market_cap).collect::<Vec<_>>()),
            Column::new(cols::CLOSE.into(), rows.iter().map(|r| r.close).collect::<Vec<_>>()),
        ])
    }

    pub fn from_frame(df: &DataFrame) -> PolarsResult<Vec<Self>> {
        let dates = read_dates(df, cols::DATE)?;
        let tickers = read_strings(df, cols::TICKER)?;
        let names = read_strings(df, cols::DISPLAY_NAME)?;
        let sectors = read_strings(df, cols::SECTOR)?;
        let caps = read_f64(df, cols::MARKET_CAP)?;
        let closes = read_f64(df, cols::CLOSE)?;

        (0..df.height())
            .map(|i| {
                Ok(Self {
                    date: dates[i],
                    ticker: required(tickers[i].clone(), cols::TICKER, i)?,
                    display_name: required(names[i].clone(), cols::DISPLAY_NAME, i)?,
                    sector: sectors[i].clone(),
                    market_cap: required(caps[i], cols::MARKET_CAP, i)?,
                    close: required(closes[i], cols::CLOSE, i)?,
                })
            })
            .collect()
    }
}

/// Equal-weighted index level for one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRow {
    pub date: NaiveDate,
    pub stock_count: u32,
    pub index_value: f64,
}

impl IndexRow {
    pub fn to_frame(rows: &[IndexRow]) -> PolarsResult<DataFrame> {
        let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
        DataFrame::new(vec![
            date_column(cols::DATE, &dates)?,
            Column::new(cols::STOCK_COUNT.into(), rows.iter().map(|r| r.stock_count).collect::<Vec<_>>()),
            Column::new(cols::INDEX_VALUE.into(), rows.iter().map(|r| r.index_value).collect::<Vec<_>>()),
        ])
    }

    pub fn from_frame(df: &DataFrame) -> PolarsResult<Vec<Self>> {
        let dates = read_dates(df, cols::DATE)?;
        let counts = read_u32(df, cols::STOCK_COUNT)?;
        let values = read_f64(df, cols::INDEX_VALUE)?;

        (0..df.height())
            .map(|i| {
                Ok(Self {
                    date: dates[i],
                    stock_count: required(counts[i], cols::STOCK_COUNT, i)?,
                    index_value: required(values[i], cols::INDEX_VALUE, i)?,
                })
            })
            .collect()
    }
}

/// A constituent alongside the index level of its date.
///
/// The index fields are `None` when no index row exists for the date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionRow {
    pub date: NaiveDate,
    pub ticker: String,
    pub display_name: String,
    pub sector: Option<String>,
    pub market_cap: f64,
    pub close: f64,
    pub stock_count: Option<u32>,
    pub index_value: Option<f64>,
    pub value: Option<f64>,
}

impl CompositionRow {
    pub fn from_frame(df: &DataFrame) -> PolarsResult<Vec<Self>> {
        let constituents = ConstituentRow::from_frame(df)?;
        let counts = read_u32(df, cols::STOCK_COUNT)?;
        let levels = read_f64(df, cols::INDEX_VALUE)?;
        let values = read_f64(df, cols::VALUE)?;

        Ok(constituents
            .into_iter()
            .enumerate()
            .map(|(i, c)| Self {
                date: c.date,
                ticker: c.ticker,
                display_name: c.display_name,
                sector: c.sector,
                market_cap: c.market_cap,
                close: c.close,
                stock_count: counts[i],
                index_value: levels[i],
                value: values[i],
            })
            .collect())
    }
}
