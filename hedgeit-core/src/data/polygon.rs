//! Polygon.io reference-tickers provider.
//!
//! Lists active common stocks per exchange via `/v3/reference/tickers`. The
//! response carries a `next_url` cursor; Polygon omits the API key from it, so
//! it is appended again on every follow-up call.

use super::provider::{DataError, TickerListing, TickerPage, TickerProvider};
use serde::Deserialize;
use std::time::Duration;

const TICKERS_URL: &str = "https://api.polygon.io/v3/reference/tickers";
const PAGE_LIMIT: u32 = 1000;

#[derive(Debug, Deserialize)]
struct TickersResponse {
    status: Option<String>,
    count: Option<u64>,
    next_url: Option<String>,
    #[serde(default)]
    results: Vec<TickerResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TickerResult {
    ticker: String,
    #[serde(default)]
    primary_exchange: Option<String>,
}

/// Polygon reference-data client.
pub struct PolygonProvider {
    client: reqwest::blocking::Client,
    api_key: String,
}

impl PolygonProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DataError::ProviderUnavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    fn first_url(exchange: &str) -> String {
        format!(
            "{TICKERS_URL}?market=stocks&active=true&type=CS&exchange={exchange}&limit={PAGE_LIMIT}"
        )
    }

    fn with_key(&self, url: &str) -> String {
        let sep = if url.contains('?') { '&' } else { '?' };
        format!("{url}{sep}apiKey={}", self.api_key)
    }

    fn parse_page(resp: TickersResponse) -> Result<TickerPage, DataError> {
        if let Some(error) = resp.error {
            return Err(DataError::Other(error));
        }
        tracing::info!(
            status = resp.status.as_deref().unwrap_or("-"),
            count = resp.count.unwrap_or(0),
            next = resp.next_url.as_deref().unwrap_or("-"),
            "polygon page received"
        );

        let listings = resp
            .results
            .into_iter()
            .map(|r| TickerListing {
                ticker: r.ticker,
                primary_exchange: r.primary_exchange.unwrap_or_default(),
            })
            .collect();

        Ok(TickerPage {
            listings,
            next: resp.next_url,
        })
    }

    fn fetch(&self, url: &str) -> Result<TickerPage, DataError> {
        let resp = self
            .client
            .get(self.with_key(url))
            .send()
            .map_err(|e| DataError::ProviderUnavailable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited { retry_after_secs: 60 });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DataError::AuthenticationRequired(format!(
                "Polygon rejected the API key ({status})"
            )));
        }
        if !status.is_success() {
            return Err(DataError::Other(format!("HTTP {status} from Polygon")));
        }

        let body: TickersResponse = resp
            .json()
            .map_err(|e| DataError::ResponseFormatChanged(format!("polygon tickers: {e}")))?;
        Self::parse_page(body)
    }
}

impl TickerProvider for PolygonProvider {
    fn name(&self) -> &str {
        "polygon"
    }

    fn first_page(&self, exchange: &str) -> Result<TickerPage, DataError> {
        self.fetch(&Self::first_url(exchange))
    }

    fn next_page(&self, cursor: &str) -> Result<TickerPage, DataError> {
        self.fetch(cursor)
    }
}
