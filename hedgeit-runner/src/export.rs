//! Reporting and export: CSV, Markdown, and the terminal chart.
//!
//! - **CSV**: any frame, column order preserved; used for the index series and
//!   a single day's composition
//! - **Markdown**: one report per build with summary metrics, daily changes,
//!   and the latest composition
//! - **Text chart**: horizontal bars of the index series for `show`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use polars::prelude::*;

use hedgeit_core::domain::{date_from_days, CompositionRow, IndexRow};

use crate::metrics::IndexMetrics;
use crate::runner::IndexOutputs;

pub const INDEX_CSV: &str = "index.csv";
pub const REPORT_MD: &str = "report.md";

/// `composition_<YYYY-MM-DD>.csv`
pub fn composition_file_name(date: NaiveDate) -> String {
    format!("composition_{}.csv", date.format("%Y-%m-%d"))
}

// ─── CSV export ─────────────────────────────────────────────────────

fn cell(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Date(days) => date_from_days(days).to_string(),
        AnyValue::Float64(v) => v.to_string(),
        AnyValue::Float32(v) => v.to_string(),
        other => other.to_string(),
    }
}

/// Render a frame as CSV with a header row. Nulls become empty cells.
pub fn frame_to_csv(df: &DataFrame) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(df.get_column_names().iter().map(|n| n.as_str()))?;

    let columns = df.get_columns();
    for row in 0..df.height() {
        let mut record = Vec::with_capacity(columns.len());
        for column in columns {
            record.push(cell(column.get(row)?));
        }
        wtr.write_record(&record)?;
    }

    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output was not UTF-8")
}

// ─── Markdown report ────────────────────────────────────────────────

fn pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:+.2}%"))
}

/// Human-readable report of an index build.
pub fn generate_report(
    metrics: &IndexMetrics,
    composition: &[CompositionRow],
    processing_date: NaiveDate,
) -> String {
    let mut md = String::new();
    md.push_str("# Equal-Weighted Index Report\n\n");
    md.push_str(&format!("Processing date: {processing_date}\n\n"));

    md.push_str("## Summary\n\n");
    md.push_str("| Metric | Value |\n|---|---|\n");
    let span = match (metrics.first_date, metrics.last_date) {
        (Some(first), Some(last)) => format!("{first} to {last}"),
        _ => "no data".to_string(),
    };
    md.push_str(&format!("| Period | {span} |\n"));
    md.push_str(&format!(
        "| Cumulative return | {} |\n",
        pct(metrics.cumulative_return_pct)
    ));
    md.push_str(&format!(
        "| Latest daily change | {} |\n",
        pct(metrics.latest_change_pct)
    ));
    md.push_str(&format!(
        "| Max drawdown | {:.2}% |\n",
        metrics.max_drawdown_pct
    ));
    md.push_str(&format!(
        "| Composition changes | {} |\n\n",
        metrics.composition_change_days.len()
    ));

    md.push_str("## Daily Index\n\n");
    if metrics.daily_changes.is_empty() {
        md.push_str("No index values.\n\n");
    } else {
        md.push_str("| Date | Index value | Change |\n|---|---:|---:|\n");
        for change in &metrics.daily_changes {
            md.push_str(&format!(
                "| {} | {:.4} | {} |\n",
                change.date,
                change.index_value,
                pct(change.pct_change)
            ));
        }
        md.push('\n');
    }

    if !metrics.composition_change_days.is_empty() {
        md.push_str("## Composition Changes\n\n");
        for day in &metrics.composition_change_days {
            md.push_str(&format!("- {day}\n"));
        }
        md.push('\n');
    }

    if let Some(first) = composition.first() {
        md.push_str(&format!("## Composition on {}\n\n", first.date));
        md.push_str("| Ticker | Name | Sector | Market cap | Close | Value |\n");
        md.push_str("|---|---|---|---:|---:|---:|\n");
        for row in composition {
            md.push_str(&format!(
                "| {} | {} | {} | {:.0} | {:.2} | {} |\n",
                row.ticker,
                row.display_name,
                row.sector.as_deref().unwrap_or("-"),
                row.market_cap,
                row.close,
                row.value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}")),
            ));
        }
    }

    md
}

// ─── Text chart ─────────────────────────────────────────────────────

/// One bar per index date, scaled so the largest value spans `width` cells.
pub fn render_bar_chart(index: &[IndexRow], width: usize) -> String {
    let max = index
        .iter()
        .map(|r| r.index_value)
        .fold(0.0_f64, f64::max);

    let mut out = String::new();
    for row in index {
        let cells = if max > 0.0 {
            ((row.index_value / max) * width as f64).round() as usize
        } else {
            0
        };
        out.push_str(&format!(
            "{}  {:>12.4}  {}\n",
            row.date,
            row.index_value,
            "█".repeat(cells)
        ));
    }
    out
}

// ─── Artifact directory ─────────────────────────────────────────────

/// Write `index.csv`, the composition CSV for `date` (default: first index
/// date), and `report.md` into `output_dir`. Returns the written paths.
pub fn save_exports(
    outputs: &IndexOutputs,
    date: Option<NaiveDate>,
    processing_date: NaiveDate,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let mut written = Vec::new();

    let index_path = output_dir.join(INDEX_CSV);
    std::fs::write(&index_path, frame_to_csv(&outputs.index)?)
        .with_context(|| format!("failed to write {}", index_path.display()))?;
    written.push(index_path);

    let selected = match date {
        Some(d) => Some(d),
        None => outputs.first_date()?,
    };
    let composition = match selected {
        Some(d) => {
            let path = output_dir.join(composition_file_name(d));
            std::fs::write(&path, frame_to_csv(&outputs.composition_frame_on(d)?)?)
                .with_context(|| format!("failed to write {}", path.display()))?;
            written.push(path);
            outputs.composition_on(d)?
        }
        None => Vec::new(),
    };

    let report = generate_report(&outputs.metrics()?, &composition, processing_date);
    let report_path = output_dir.join(REPORT_MD);
    std::fs::write(&report_path, report)
        .with_context(|| format!("failed to write {}", report_path.display()))?;
    written.push(report_path);

    Ok(written)
}
