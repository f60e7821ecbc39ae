//! End-to-end pipeline scenarios: wide prices + shares → index and composition.

use chrono::NaiveDate;
use hedgeit_core::data::WidePriceTable;
use hedgeit_core::domain::{CompositionRow, ConstituentRow, IndexRow, PriceBar, SharesRecord};
use hedgeit_core::pipeline::{
    compute_market_cap, equal_weighted_index, index_composition, rank_top_n, reshape_batches,
    RankerConfig,
};
use hedgeit_core::schema::tables;
use hedgeit_core::store::TableStore;
use polars::prelude::DataFrame;
use std::collections::BTreeMap;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()
}

fn trading_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 13).unwrap()
}

fn wide(closes: &[(&str, f64)]) -> WidePriceTable {
    let bars: BTreeMap<String, Vec<PriceBar>> = closes
        .iter()
        .map(|(t, c)| {
            (
                t.to_string(),
                vec![PriceBar::complete(trading_day(), *c, *c, *c, *c, 1_000.0)],
            )
        })
        .collect();
    WidePriceTable::from_bars(&bars).unwrap()
}

fn shares(rows: &[(&str, f64)]) -> DataFrame {
    let records: Vec<SharesRecord> = rows
        .iter()
        .map(|(t, s)| SharesRecord {
            ticker: t.to_string(),
            shares_outstanding: *s,
            industry: Some("Industry".into()),
            sector: Some("Sector".into()),
            display_name: format!("{t} Holdings"),
        })
        .collect();
    SharesRecord::to_frame(&records).unwrap()
}

struct Outputs {
    constituents: Vec<ConstituentRow>,
    index: Vec<IndexRow>,
    composition: Vec<CompositionRow>,
}

fn run(batches: &[WidePriceTable], shares: &DataFrame, top_n: usize) -> Outputs {
    let prices = reshape_batches(batches).unwrap();
    let stocks = compute_market_cap(&prices, shares).unwrap();
    let config = RankerConfig {
        top_n,
        window_days: 30,
    };
    let top = rank_top_n(&stocks, &config, today()).unwrap();
    let index = equal_weighted_index(&top).unwrap();
    let composition = index_composition(&top, &index).unwrap();

    Outputs {
        constituents: ConstituentRow::from_frame(&top).unwrap(),
        index: IndexRow::from_frame(&index).unwrap(),
        composition: CompositionRow::from_frame(&composition).unwrap(),
    }
}

#[test]
fn two_stocks_equal_weighted_at_200() {
    let out = run(
        &[wide(&[("A", 100.0), ("B", 300.0)])],
        &shares(&[("A", 1_000_000.0), ("B", 500_000.0)]),
        2,
    );

    assert_eq!(out.constituents.len(), 2);
    assert_eq!(out.constituents[0].ticker, "B");
    assert_eq!(out.constituents[0].market_cap, 150_000_000.0);
    assert_eq!(out.constituents[1].market_cap, 100_000_000.0);

    assert_eq!(
        out.index,
        vec![IndexRow {
            date: trading_day(),
            stock_count: 2,
            index_value: 200.0,
        }]
    );

    let values: Vec<Option<f64>> = out.composition.iter().map(|r| r.value).collect();
    assert_eq!(values, vec![Some(150.0), Some(50.0)]);
}

#[test]
fn larger_cap_displaces_smallest() {
    let out = run(
        &[
            wide(&[("A", 100.0), ("B", 300.0)]),
            wide(&[("C", 50.0)]),
        ],
        &shares(&[("A", 1_000_000.0), ("B", 500_000.0), ("C", 10_000_000.0)]),
        2,
    );

    let tickers: Vec<&str> = out.constituents.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(tickers, vec!["C", "B"]);
    assert_eq!(out.index[0].index_value, 175.0);
    assert_eq!(out.index[0].stock_count, 2);
}

#[test]
fn stored_tables_replay_identically() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = TableStore::open(dir.path()).unwrap();
    let batches = [wide(&[("A", 100.0), ("B", 300.0), ("C", 50.0)])];
    let shares = shares(&[("A", 1e6), ("B", 5e5), ("C", 1e7)]);

    let mut hashes = Vec::new();
    for _ in 0..2 {
        let prices = reshape_batches(&batches).unwrap();
        let stocks = compute_market_cap(&prices, &shares).unwrap();
        let top = rank_top_n(&stocks, &RankerConfig::default(), today()).unwrap();
        let index = equal_weighted_index(&top).unwrap();

        hashes.push((
            store.replace(tables::STOCKS, &stocks).unwrap().content_hash,
            store.replace(tables::TOP_MCAP, &top).unwrap().content_hash,
            store.replace(tables::INDEX, &index).unwrap().content_hash,
        ));
    }

    assert_eq!(hashes[0], hashes[1]);

    // Reading back the persisted constituents reproduces the index.
    let top = store.read(tables::TOP_MCAP).unwrap();
    let index = IndexRow::from_frame(&equal_weighted_index(&top).unwrap()).unwrap();
    assert_eq!(index[0].stock_count, 3);
    let expected = 100.0 / 3.0 + 300.0 / 3.0 + 50.0 / 3.0;
    assert!((index[0].index_value - expected).abs() < 1e-9);
}
