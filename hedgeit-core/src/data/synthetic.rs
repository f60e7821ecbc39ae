//! Deterministic synthetic provider for offline runs and demos.
//!
//! Every value is derived from a BLAKE3 hash of the ticker, so two runs with the
//! same settings produce identical tables. The data is clearly fake: tickers
//! are `SYN0000`, `SYN0001`, ... and display names say "Synthetic".

use super::provider::{
    DataError, PriceHistoryProvider, SharesProvider, TickerListing, TickerPage, TickerProvider,
};
use super::wide::WidePriceTable;
use crate::domain::{PriceBar, SharesRecord};
use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

const PAGE_SIZE: usize = 100;
const SECTORS: [(&str, &str); 5] = [
    ("Technology", "Software"),
    ("Healthcare", "Drug Manufacturers"),
    ("Financial Services", "Banks"),
    ("Energy", "Oil & Gas"),
    ("Consumer Defensive", "Beverages"),
];

/// Synthetic ticker, shares, and price-history source.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    /// Last date of generated history.
    pub as_of: NaiveDate,
    /// Listings per exchange.
    pub universe_size: usize,
}

impl SyntheticProvider {
    pub fn new(as_of: NaiveDate, universe_size: usize) -> Self {
        Self { as_of, universe_size }
    }

    fn rng_for(ticker: &str, salt: &str) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(ticker.as_bytes());
        hasher.update(salt.as_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }

    fn ticker_at(index: usize) -> String {
        format!("SYN{index:04}")
    }

    fn page_from(&self, exchange: &str, offset: usize) -> TickerPage {
        let end = (offset + PAGE_SIZE).min(self.universe_size);
        let listings = (offset..end)
            .map(|i| TickerListing {
                ticker: Self::ticker_at(i),
                primary_exchange: exchange.to_string(),
            })
            .collect();
        let next = (end < self.universe_size).then(|| format!("{exchange}:{end}"));
        TickerPage { listings, next }
    }

    /// Weekday bars over the `period_days` calendar days ending at `as_of`.
    pub fn bars(&self, ticker: &str, period_days: u32) -> Vec<PriceBar> {
        let mut rng = Self::rng_for(ticker, "prices");
        let start = self.as_of - chrono::Duration::days(i64::from(period_days.saturating_sub(1)));

        let mut bars = Vec::new();
        let mut price: f64 = rng.gen_range(10.0..500.0);
        let mut current = start;

        while current <= self.as_of {
            let weekday = current.weekday();
            if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
                current += chrono::Duration::days(1);
                continue;
            }

            let daily_return: f64 = rng.gen_range(-0.03..0.03);
            let open = price;
            let close = price * (1.0 + daily_return);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume = rng.gen_range(500_000..5_000_000u64) as f64;

            bars.push(PriceBar::complete(current, open, high, low, close, volume));

            price = close;
            current += chrono::Duration::days(1);
        }

        bars
    }
}

impl TickerProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn first_page(&self, exchange: &str) -> Result<TickerPage, DataError> {
        Ok(self.page_from(exchange, 0))
    }

    fn next_page(&self, cursor: &str) -> Result<TickerPage, DataError> {
        let (exchange, offset) = cursor
            .split_once(':')
            .and_then(|(x, o)| o.parse::<usize>().ok().map(|o| (x, o)))
            .ok_or_else(|| DataError::Other(format!("bad synthetic cursor: {cursor}")))?;
        Ok(self.page_from(exchange, offset))
    }
}

impl SharesProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn shares(&self, ticker: &str) -> Result<Option<SharesRecord>, DataError> {
        let mut rng = Self::rng_for(ticker, "shares");

        // roughly one ticker in twenty has no shares figure, like funds on Yahoo
        if rng.gen_range(0..20) == 0 {
            return Ok(None);
        }

        let (sector, industry) = SECTORS[rng.gen_range(0..SECTORS.len())];
        Ok(Some(SharesRecord {
            ticker: ticker.to_string(),
            shares_outstanding: rng.gen_range(1_000_000u64..5_000_000_000) as f64,
            industry: Some(industry.to_string()),
            sector: Some(sector.to_string()),
            display_name: format!("Synthetic {ticker}"),
        }))
    }
}

impl PriceHistoryProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn history(&self, tickers: &[String], period_days: u32) -> Result<WidePriceTable, DataError> {
        let symbol_bars: BTreeMap<String, Vec<PriceBar>> = tickers
            .iter()
            .map(|t| (t.clone(), self.bars(t, period_days)))
            .collect();

        let table = WidePriceTable::from_bars(&symbol_bars)?;
        if table.is_empty() {
            return Err(DataError::NoData(format!("ticker batch of {}", tickers.len())));
        }
        Ok(table)
    }
}
