//! Market data providers and fan-out fetching

pub mod fetch;
pub mod polygon;
pub mod provider;
pub mod synthetic;
pub mod universe;
pub mod wide;
pub mod yahoo;

pub use fetch::{default_workers, fetch_market_data, FanOut, FetchSettings, Gathered, MarketData};
pub use polygon::PolygonProvider;
pub use provider::{
    DataError, DataSource, PriceHistoryProvider, SharesProvider, TickerListing, TickerPage,
    TickerProvider,
};
pub use synthetic::SyntheticProvider;
pub use universe::{tickers_by_exchange, Universe, POLYGON_FREE_CALLS_PER_MINUTE};
pub use wide::WidePriceTable;
pub use yahoo::YahooProvider;
