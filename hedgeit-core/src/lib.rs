//! hedge-it core: market data providers, the index pipeline, and the table store.
//!
//! This crate contains everything needed to turn exchange listings into an
//! equal-weighted index:
//! - Provider traits for tickers, shares snapshots, and price history, with
//!   Polygon, Yahoo Finance, and synthetic implementations
//! - A bounded fan-out fetcher that maps partial failures to excluded keys
//! - Pipeline stages: reshape, market cap, top-N ranking, index, composition
//! - A Parquet-backed table store with create-or-replace semantics

pub mod data;
pub mod domain;
pub mod pipeline;
pub mod schema;
pub mod store;
