//! Exchange universe: the ticker list the index is built from.
//!
//! Walks a [`TickerProvider`]'s pages per exchange code and keeps only the
//! listings whose primary exchange is the one requested.

use super::provider::{TickerListing, TickerProvider};
use tracing::{error, info, warn};

/// Free Polygon accounts allow this many reference calls per minute.
pub const POLYGON_FREE_CALLS_PER_MINUTE: usize = 5;

/// Listings gathered across exchanges, in provider order.
#[derive(Debug, Clone, Default)]
pub struct Universe {
    pub listings: Vec<TickerListing>,
    /// Total provider calls made to build this universe.
    pub api_calls: usize,
}

impl Universe {
    /// The first `limit` ticker symbols.
    pub fn tickers(&self, limit: usize) -> Vec<String> {
        self.listings
            .iter()
            .take(limit)
            .map(|l| l.ticker.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

/// Collect every listing on the given exchanges, following pagination.
///
/// A failed page ends that exchange with whatever was gathered before it;
/// remaining exchanges still run. No call is ever retried.
pub fn tickers_by_exchange(provider: &dyn TickerProvider, exchanges: &[String]) -> Universe {
    let mut universe = Universe::default();

    for exchange in exchanges {
        info!(exchange = %exchange, provider = provider.name(), "listing tickers");
        let mut cursor: Option<String> = None;

        loop {
            universe.api_calls += 1;
            if universe.api_calls > POLYGON_FREE_CALLS_PER_MINUTE {
                warn!(
                    calls = universe.api_calls,
                    limit = POLYGON_FREE_CALLS_PER_MINUTE,
                    "ticker API call count exceeds the free-tier per-minute limit"
                );
            }

            let page = match &cursor {
                Some(next) => provider.next_page(next),
                None => provider.first_page(exchange),
            };
            let page = match page {
                Ok(page) => page,
                Err(e) => {
                    error!(exchange = %exchange, error = %e, "ticker page failed");
                    break;
                }
            };

            let before = universe.listings.len();
            universe.listings.extend(
                page.listings
                    .into_iter()
                    .filter(|l| &l.primary_exchange == exchange),
            );
            info!(
                exchange = %exchange,
                kept = universe.listings.len() - before,
                "filtered ticker page"
            );

            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
    }

    universe
}
