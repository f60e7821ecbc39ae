//! Shares-outstanding snapshot records.

use super::{read_f64, read_strings, required};
use crate::schema::cols;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Point-in-time shares and metadata for one ticker.
///
/// This is a snapshot, not a series: market caps for past days are computed
/// with today's share count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharesRecord {
    pub ticker: String,
    pub shares_outstanding: f64,
    pub industry: Option<String>,
    pub sector: Option<String>,
    pub display_name: String,
}

impl SharesRecord {
    /// Build the `shares` frame from records, in the order given.
    pub fn to_frame(records: &[SharesRecord]) -> PolarsResult<DataFrame> {
        let tickers: Vec<&str> = records.iter().map(|r| r.ticker.as_str()).collect();
        let shares: Vec<f64> = records.iter().map(|r| r.shares_outstanding).collect();
        let industries: Vec<Option<&str>> = records.iter().map(|r| r.industry.as_deref()).collect();
        let sectors: Vec<Option<&str>> = records.iter().map(|r| r.sector.as_deref()).collect();
        let names: Vec<&str> = records.iter().map(|r| r.display_name.as_str()).collect();

        DataFrame::new(vec![
            Column::new(cols::TICKER.into(), tickers),
            Column::new(cols::SHARES_OUTSTANDING.into(), shares),
            Column::new(cols::INDUSTRY.into(), industries),
            Column::new(cols::SECTOR.into(), sectors),
            Column::new(cols::DISPLAY_NAME.into(), names),
        ])
    }

    pub fn from_frame(df: &DataFrame) -> PolarsResult<Vec<Self>> {
        let tickers = read_strings(df, cols::TICKER)?;
        let shares = read_f64(df, cols::SHARES_OUTSTANDING)?;
        let industries = read_strings(df, cols::INDUSTRY)?;
        let sectors = read_strings(df, cols::SECTOR)?;
        let names = read_strings(df, cols::DISPLAY_NAME)?;

        (0..df.height())
            .map(|i| {
                Ok(Self {
                    ticker: required(tickers[i].clone(), cols::TICKER, i)?,
                    shares_outstanding: required(shares[i], cols::SHARES_OUTSTANDING, i)?,
                    industry: industries[i].clone(),
                    sector: sectors[i].clone(),
                    display_name: required(names[i].clone(), cols::DISPLAY_NAME, i)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableSchema;

    #[test]
    fn frame_matches_shares_schema() {
        let records = vec![
            SharesRecord {
                ticker: "AAA".into(),
                shares_outstanding: 1_000_000.0,
                industry: Some("Banks".into()),
                sector: Some("Financial Services".into()),
                display_name: "Alpha".into(),
            },
            SharesRecord {
                ticker: "BBB".into(),
                shares_outstanding: 500_000.0,
                industry: None,
                sector: None,
                display_name: "Beta".into(),
            },
        ];

        let df = SharesRecord::to_frame(&records).unwrap();
        TableSchema::validate(&df, &TableSchema::shares()).unwrap();
        assert_eq!(SharesRecord::from_frame(&df).unwrap(), records);
    }

    #[test]
    fn empty_records_still_typed() {
        let df = SharesRecord::to_frame(&[]).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.column(cols::SHARES_OUTSTANDING).unwrap().dtype(), &DataType::Float64);
    }
}
