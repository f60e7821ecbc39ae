//! Property tests for pipeline invariants.
//!
//! Uses proptest to verify:
//! 1. Reshape completeness — aligned input yields |dates| × |tickers| rows
//! 2. Join exactness — market_cap is exactly shares × close, tickers in both inputs
//! 3. Ranking — per-date size is min(N, available) and no excluded row outranks a kept one
//! 4. Index — stock_count = k and index_value = Σ close / k
//! 5. Composition — value = close / stock_count

use chrono::NaiveDate;
use hedgeit_core::data::WidePriceTable;
use hedgeit_core::domain::{
    CompositionRow, ConstituentRow, IndexRow, PriceBar, SharesRecord, StockRow,
};
use hedgeit_core::pipeline::{
    compute_market_cap, equal_weighted_index, index_composition, rank_top_n, reshape_prices,
    RankerConfig,
};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (1.0..1000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_shares() -> impl Strategy<Value = f64> {
    (1_000u64..10_000_000_000u64).prop_map(|s| s as f64)
}

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

fn ticker(i: usize) -> String {
    format!("T{i:03}")
}

/// (date offset, ticker index, close, shares) rows with unique (date, ticker).
fn arb_stocks() -> impl Strategy<Value = Vec<StockRow>> {
    prop::collection::btree_map((0u32..5, 0usize..12), (arb_price(), arb_shares()), 1..40).prop_map(
        |cells| {
            cells
                .into_iter()
                .map(|((d, t), (close, shares))| StockRow {
                    date: base_date() + chrono::Duration::days(i64::from(d)),
                    ticker: ticker(t),
                    open: close,
                    close,
                    low: close,
                    high: close,
                    volume: 1.0,
                    shares_outstanding: shares,
                    industry: None,
                    sector: None,
                    display_name: ticker(t),
                    market_cap: close * shares,
                })
                .collect()
        },
    )
}

fn processing_date() -> NaiveDate {
    base_date() + chrono::Duration::days(10)
}

// ── 1. Reshape completeness ──────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Every ticker priced on every date reshapes to dates × tickers rows.
    #[test]
    fn reshape_row_count(n_tickers in 1usize..8, n_dates in 1u32..10, close in arb_price()) {
        let bars: BTreeMap<String, Vec<PriceBar>> = (0..n_tickers)
            .map(|t| {
                let series = (0..n_dates)
                    .map(|d| {
                        let date = base_date() + chrono::Duration::days(i64::from(d));
                        PriceBar::complete(date, close, close, close, close, 10.0)
                    })
                    .collect();
                (ticker(t), series)
            })
            .collect();

        let long = reshape_prices(&WidePriceTable::from_bars(&bars).unwrap()).unwrap();
        prop_assert_eq!(long.height(), n_tickers * n_dates as usize);
    }

    /// A ticker-day with any metric missing never appears in the output.
    #[test]
    fn reshape_drops_partial_days(missing in prop::collection::vec(any::<bool>(), 1..10)) {
        let series: Vec<PriceBar> = missing
            .iter()
            .enumerate()
            .map(|(d, gap)| {
                let date = base_date() + chrono::Duration::days(d as i64);
                let mut bar = PriceBar::complete(date, 1.0, 1.0, 1.0, 1.0, 1.0);
                if *gap {
                    bar.low = None;
                }
                bar
            })
            .collect();
        let bars: BTreeMap<String, Vec<PriceBar>> = [("AAA".to_string(), series)].into_iter().collect();

        let long = reshape_prices(&WidePriceTable::from_bars(&bars).unwrap()).unwrap();
        prop_assert_eq!(long.height(), missing.iter().filter(|g| !**g).count());
    }
}

// ── 2. Join exactness ────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn market_cap_exact_and_inner(
        stocks in arb_stocks(),
        share_tickers in prop::collection::btree_set(0usize..12, 0..12),
        shares in arb_shares(),
    ) {
        let prices = StockRow::to_frame(&stocks).unwrap()
            .select(["date", "ticker", "open", "close", "low", "high", "volume"])
            .unwrap();
        let records: Vec<SharesRecord> = share_tickers
            .iter()
            .map(|t| SharesRecord {
                ticker: ticker(*t),
                shares_outstanding: shares,
                industry: None,
                sector: None,
                display_name: ticker(*t),
            })
            .collect();
        let shares_df = SharesRecord::to_frame(&records).unwrap();

        match compute_market_cap(&prices, &shares_df) {
            Ok(out) => {
                let rows = StockRow::from_frame(&out).unwrap();
                let price_tickers: BTreeSet<&str> = stocks.iter().map(|s| s.ticker.as_str()).collect();
                let share_names: BTreeSet<String> = share_tickers.iter().map(|t| ticker(*t)).collect();
                for row in &rows {
                    prop_assert!(price_tickers.contains(row.ticker.as_str()));
                    prop_assert!(share_names.contains(&row.ticker));
                    prop_assert_eq!(row.market_cap, row.shares_outstanding * row.close);
                }
                let expected = stocks.iter().filter(|s| share_names.contains(&s.ticker)).count();
                prop_assert_eq!(rows.len(), expected);
            }
            Err(e) => prop_assert!(e.is_empty_input() && records.is_empty()),
        }
    }
}

// ── 3. Ranking ───────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn ranking_size_and_order(stocks in arb_stocks(), top_n in 1usize..6) {
        let df = StockRow::to_frame(&stocks).unwrap();
        let config = RankerConfig { top_n, window_days: 30 };
        let kept = ConstituentRow::from_frame(&rank_top_n(&df, &config, processing_date()).unwrap()).unwrap();

        let mut available: HashMap<NaiveDate, Vec<f64>> = HashMap::new();
        for s in &stocks {
            available.entry(s.date).or_default().push(s.market_cap);
        }

        let mut kept_by_date: HashMap<NaiveDate, Vec<f64>> = HashMap::new();
        for k in &kept {
            kept_by_date.entry(k.date).or_default().push(k.market_cap);
        }

        for (date, caps) in &available {
            let retained = kept_by_date.get(date).cloned().unwrap_or_default();
            prop_assert_eq!(retained.len(), caps.len().min(top_n));

            let min_kept = retained.iter().cloned().fold(f64::INFINITY, f64::min);
            let mut sorted = caps.clone();
            sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
            if let Some(best_excluded) = sorted.get(top_n) {
                prop_assert!(min_kept >= *best_excluded);
            }
        }
    }
}

// ── 4 & 5. Index and composition ─────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn index_is_mean_close_and_composition_consistent(stocks in arb_stocks()) {
        let members: Vec<ConstituentRow> = stocks
            .iter()
            .map(|s| ConstituentRow {
                date: s.date,
                ticker: s.ticker.clone(),
                display_name: s.display_name.clone(),
                sector: None,
                market_cap: s.market_cap,
                close: s.close,
            })
            .collect();
        let top = ConstituentRow::to_frame(&members).unwrap();

        let index_df = equal_weighted_index(&top).unwrap();
        let index = IndexRow::from_frame(&index_df).unwrap();

        let mut by_date: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
        for m in &members {
            by_date.entry(m.date).or_default().push(m.close);
        }
        prop_assert_eq!(index.len(), by_date.len());
        for (row, (date, closes)) in index.iter().zip(by_date.iter()) {
            let k = closes.len();
            prop_assert_eq!(row.date, *date);
            prop_assert_eq!(row.stock_count as usize, k);
            let expected: f64 = closes.iter().map(|c| c / k as f64).sum();
            prop_assert!((row.index_value - expected).abs() <= 1e-9 * expected.abs().max(1.0));
        }

        let composition = CompositionRow::from_frame(&index_composition(&top, &index_df).unwrap()).unwrap();
        prop_assert_eq!(composition.len(), members.len());
        for row in &composition {
            let count = row.stock_count.unwrap();
            prop_assert_eq!(row.value, Some(row.close / f64::from(count)));
        }
    }
}
