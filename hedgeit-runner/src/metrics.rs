//! Index summary metrics: pure functions over the index series and constituents.
//!
//! No dependencies on the runner, the store, or the providers.

use chrono::NaiveDate;
use hedgeit_core::domain::{ConstituentRow, IndexRow};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One day of the index with its change from the previous index date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyChange {
    pub date: NaiveDate,
    pub index_value: f64,
    /// Percent change from the previous row; `None` on the first row.
    pub pct_change: Option<f64>,
}

/// Summary of an index build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetrics {
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// Percent return from the first to the last index value.
    pub cumulative_return_pct: Option<f64>,
    pub latest_change_pct: Option<f64>,
    /// Deepest peak-to-trough decline, as a negative percent.
    pub max_drawdown_pct: f64,
    pub daily_changes: Vec<DailyChange>,
    pub composition_change_days: Vec<NaiveDate>,
}

impl IndexMetrics {
    pub fn compute(index: &[IndexRow], constituents: &[ConstituentRow]) -> Self {
        let mut series: Vec<&IndexRow> = index.iter().collect();
        series.sort_by_key(|r| r.date);
        let values: Vec<f64> = series.iter().map(|r| r.index_value).collect();
        let daily_changes = daily_pct_changes(&series);

        Self {
            first_date: series.first().map(|r| r.date),
            last_date: series.last().map(|r| r.date),
            cumulative_return_pct: cumulative_return_pct(&values),
            latest_change_pct: daily_changes.last().and_then(|c| c.pct_change),
            max_drawdown_pct: max_drawdown(&values) * 100.0,
            daily_changes,
            composition_change_days: composition_change_days(constituents),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// `(last - first) / first × 100`; `None` for an empty series or a zero base.
pub fn cumulative_return_pct(values: &[f64]) -> Option<f64> {
    let first = *values.first()?;
    let last = *values.last()?;
    if first == 0.0 {
        return None;
    }
    Some((last - first) / first * 100.0)
}

/// Percent change of each index value from the previous one.
///
/// `None` on the first row and after a zero value, where the change is
/// undefined; no infinite or NaN percentages are produced.
pub fn daily_pct_changes(series: &[&IndexRow]) -> Vec<DailyChange> {
    let mut previous: Option<f64> = None;
    series
        .iter()
        .map(|row| {
            let pct_change = previous
                .filter(|p| *p != 0.0)
                .map(|p| (row.index_value - p) / p * 100.0);
            previous = Some(row.index_value);
            DailyChange {
                date: row.date,
                index_value: row.index_value,
                pct_change,
            }
        })
        .collect()
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if the series is constant or monotonically increasing.
pub fn max_drawdown(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mut peak = values[0];
    let mut max_dd = 0.0_f64;

    for &v in values {
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            let dd = (v - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Dates on which the constituent set differs from the previous date's.
///
/// The first date always counts as a change.
pub fn composition_change_days(constituents: &[ConstituentRow]) -> Vec<NaiveDate> {
    let mut by_date: BTreeMap<NaiveDate, BTreeSet<&str>> = BTreeMap::new();
    for row in constituents {
        by_date.entry(row.date).or_default().insert(row.ticker.as_str());
    }

    let mut previous: Option<&BTreeSet<&str>> = None;
    let mut days = Vec::new();
    for (date, tickers) in &by_date {
        if previous != Some(tickers) {
            days.push(*date);
        }
        previous = Some(tickers);
    }
    days
}
