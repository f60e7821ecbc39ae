//! Yahoo Finance provider.
//!
//! Daily bars come from the v8 chart API, one request per ticker; the shares
//! snapshot and display metadata come from the v10 quoteSummary API.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes. Failures are reported once and never retried.

use super::provider::{DataError, PriceHistoryProvider, SharesProvider};
use super::wide::WidePriceTable;
use crate::domain::{PriceBar, SharesRecord};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

const CHART_BASE: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const SUMMARY_BASE: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const SUMMARY_MODULES: &str = "price,summaryProfile,defaultKeyStatistics";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Yahoo Finance v10 quoteSummary response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResponse {
    quote_summary: SummaryResult,
}

#[derive(Debug, Deserialize)]
struct SummaryResult {
    result: Option<Vec<SummaryModules>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryModules {
    price: Option<PriceModule>,
    summary_profile: Option<ProfileModule>,
    default_key_statistics: Option<KeyStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    display_name: Option<String>,
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProfileModule {
    industry: Option<String>,
    sector: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatistics {
    shares_outstanding: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

/// Yahoo Finance shares and price-history provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
}

impl YahooProvider {
    pub fn new() -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::ProviderUnavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    fn chart_url(symbol: &str, period_days: u32) -> String {
        format!("{CHART_BASE}/{symbol}?range={period_days}d&interval=1d")
    }

    fn summary_url(symbol: &str) -> String {
        format!("{SUMMARY_BASE}/{symbol}?modules={SUMMARY_MODULES}")
    }

    fn api_error(symbol: &str, error: Option<ApiError>) -> DataError {
        match error {
            Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description)),
            None => DataError::ResponseFormatChanged("empty result with no error".into()),
        }
    }

    /// Parse the chart API response into bars, skipping days with no metric at all.
    fn parse_chart(symbol: &str, resp: ChartResponse) -> Result<Vec<PriceBar>, DataError> {
        let ChartResult { result, error } = resp.chart;
        let data = result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| Self::api_error(symbol, error))?;

        let timestamps = data
            .timestamp
            .ok_or_else(|| DataError::NoData(symbol.to_string()))?;

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))?;

            let bar = PriceBar {
                date,
                open: quote.open.get(i).copied().flatten(),
                high: quote.high.get(i).copied().flatten(),
                low: quote.low.get(i).copied().flatten(),
                close: quote.close.get(i).copied().flatten(),
                volume: quote.volume.get(i).copied().flatten(),
            };
            if !bar.is_void() {
                bars.push(bar);
            }
        }

        if bars.is_empty() {
            return Err(DataError::NoData(symbol.to_string()));
        }
        Ok(bars)
    }

    /// Pull the required fields out of a quoteSummary response.
    ///
    /// Returns `Ok(None)` when shares outstanding or a display name is missing.
    fn parse_summary(symbol: &str, resp: SummaryResponse) -> Result<Option<SharesRecord>, DataError> {
        let SummaryResult { result, error } = resp.quote_summary;
        let modules = result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| Self::api_error(symbol, error))?;

        let shares = modules
            .default_key_statistics
            .and_then(|s| s.shares_outstanding)
            .and_then(|v| v.raw)
            .filter(|v| v.is_finite());
        let display_name = modules
            .price
            .and_then(|p| p.display_name.or(p.long_name).or(p.short_name));
        let (industry, sector) = modules
            .summary_profile
            .map(|p| (p.industry, p.sector))
            .unwrap_or((None, None));

        match (shares, display_name) {
            (Some(shares_outstanding), Some(display_name)) => Ok(Some(SharesRecord {
                ticker: symbol.to_string(),
                shares_outstanding,
                industry,
                sector,
                display_name,
            })),
            _ => Ok(None),
        }
    }

    /// Issue one GET and decode the JSON body, mapping HTTP status to [`DataError`].
    fn get_json<T: serde::de::DeserializeOwned>(&self, symbol: &str, url: &str) -> Result<T, DataError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| DataError::ProviderUnavailable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited {
                retry_after_secs: retry_after,
            });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DataError::AuthenticationRequired(format!(
                "Yahoo Finance rejected the request for {symbol} ({status})"
            )));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        if !status.is_success() {
            return Err(DataError::Other(format!("HTTP {status} for {symbol}")));
        }

        resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })
    }

    fn bars(&self, symbol: &str, period_days: u32) -> Result<Vec<PriceBar>, DataError> {
        let chart: ChartResponse = self.get_json(symbol, &Self::chart_url(symbol, period_days))?;
        Self::parse_chart(symbol, chart)
    }
}

impl SharesProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn shares(&self, ticker: &str) -> Result<Option<SharesRecord>, DataError> {
        let summary: SummaryResponse = self.get_json(ticker, &Self::summary_url(ticker))?;
        Self::parse_summary(ticker, summary)
    }
}

impl PriceHistoryProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn history(&self, tickers: &[String], period_days: u32) -> Result<WidePriceTable, DataError> {
        let mut symbol_bars = BTreeMap::new();
        for ticker in tickers {
            match self.bars(ticker, period_days) {
                Ok(bars) => {
                    debug!(ticker = %ticker, bars = bars.len(), "fetched history");
                    symbol_bars.insert(ticker.clone(), bars);
                }
                Err(e) => warn!(ticker = %ticker, error = %e, "history fetch failed, skipping ticker"),
            }
        }

        if symbol_bars.is_empty() {
            return Err(DataError::NoData(format!("ticker batch of {}", tickers.len())));
        }
        Ok(WidePriceTable::from_bars(&symbol_bars)?)
    }
}
