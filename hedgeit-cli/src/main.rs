//! hedge-it CLI: build and inspect an equal-weighted top-N market cap index.
//!
//! Commands:
//! - `build` — list tickers, fetch shares and prices, persist `stocks`, `top_mcap`, `index`
//! - `preview` — the same build narrowed to the first 10 tickers, top 2 by default
//! - `show` — print the stored index with a text chart and one day's composition
//! - `export` — write `index.csv`, `composition_<date>.csv`, and `report.md`

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use hedgeit_core::data::{DataSource, PolygonProvider, SyntheticProvider, YahooProvider};
use hedgeit_core::store::TableStore;
use hedgeit_runner::{
    init_logging, load_outputs, render_bar_chart, run_pipeline, save_exports, IndexConfig,
    IndexOutputs, LogLevel, Providers, RunContext,
};

const CHART_WIDTH: usize = 40;

#[derive(Parser)]
#[command(
    name = "hedge-it",
    about = "hedge-it: equal-weighted index of the largest US stocks by market cap"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch market data and build the index.
    Build(BuildArgs),
    /// Build a small index: top 2 (or `--top-n`) of the first 10 tickers.
    Preview(BuildArgs),
    /// Print the stored index series and the composition for one date.
    Show {
        #[command(flatten)]
        store: StoreArgs,

        /// Composition date (YYYY-MM-DD). Defaults to the first index date.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Write CSV and Markdown exports of the stored index.
    Export {
        #[command(flatten)]
        store: StoreArgs,

        /// Composition date (YYYY-MM-DD). Defaults to the first index date.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Date shown as the processing date in the report. Defaults to today.
        #[arg(long)]
        as_of: Option<NaiveDate>,

        /// Output directory.
        #[arg(long, default_value = "exports")]
        out: PathBuf,
    },
}

#[derive(Args)]
struct StoreArgs {
    /// Table store directory.
    #[arg(long, default_value = "stocks_db")]
    store_dir: PathBuf,

    /// Log level: DEBUG, INFO, WARNING, ERROR.
    #[arg(short = 'l', long, default_value = "INFO")]
    log_level: LogLevel,
}

#[derive(Args)]
struct BuildArgs {
    /// Path to a TOML config file. Flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level: DEBUG, INFO, WARNING, ERROR.
    #[arg(short = 'l', long)]
    log_level: Option<LogLevel>,

    /// Polygon API key for the ticker listing.
    #[arg(short = 'k', long, env = "POLYGON_API_KEY", hide_env_values = true)]
    polygon_api_key: Option<String>,

    /// Maximum tickers taken from the listing.
    #[arg(long)]
    stock_limit: Option<usize>,

    /// Constituents per date (preview default: 2).
    #[arg(long)]
    top_n: Option<usize>,

    /// Exchange codes to list (repeatable), e.g. XNYS.
    #[arg(long = "exchange")]
    exchanges: Vec<String>,

    /// Table store directory.
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// Directory for the per-day log file.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Use the deterministic synthetic provider instead of Polygon and Yahoo.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Processing date (YYYY-MM-DD) anchoring the window. Defaults to today.
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

impl BuildArgs {
    /// File values first, then flag overrides.
    fn resolve(&self, preview: bool) -> Result<IndexConfig> {
        let mut config = match &self.config {
            Some(path) => IndexConfig::from_file(path)?,
            None => IndexConfig::default(),
        };
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(key) = &self.polygon_api_key {
            config.polygon_api_key = Some(key.clone());
        }
        if let Some(limit) = self.stock_limit {
            config.stock_limit = limit;
        }
        if let Some(top_n) = self.top_n {
            if preview {
                config.preview_top_n = top_n;
            } else {
                config.top_n = top_n;
            }
        }
        if !self.exchanges.is_empty() {
            config.exchanges = self.exchanges.clone();
        }
        if let Some(dir) = &self.store_dir {
            config.store_dir = dir.clone();
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = Some(dir.clone());
        }

        let config = if preview { config.into_preview() } else { config };
        config.validate()?;
        if !self.synthetic {
            config.require_api_key()?;
        }
        Ok(config)
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build(args) => run_build(&args, false),
        Commands::Preview(args) => run_build(&args, true),
        Commands::Show { store, date } => run_show(&store, date),
        Commands::Export {
            store,
            date,
            as_of,
            out,
        } => run_export(&store, date, as_of.unwrap_or_else(today), &out),
    }
}

fn run_build(args: &BuildArgs, preview: bool) -> Result<()> {
    let config = args.resolve(preview)?;
    let processing_date = args.as_of.unwrap_or_else(today);

    if let Some(path) = init_logging(config.log_level, config.log_dir.as_deref(), processing_date)? {
        println!("Logging to: {}", path.display());
    }
    info!(fingerprint = %config.fingerprint(), preview, "starting build");

    let store = TableStore::open(&config.store_dir)?;

    let (ctx, outputs) = if args.synthetic {
        let provider = SyntheticProvider::new(processing_date, config.stock_limit);
        run_pipeline(&config, Providers::synthetic(&provider), &store, processing_date)?
    } else {
        let polygon = PolygonProvider::new(config.require_api_key()?)?;
        let yahoo = YahooProvider::new()?;
        let providers = Providers {
            tickers: &polygon,
            shares: &yahoo,
            history: &yahoo,
            source: DataSource::YahooFinance,
        };
        run_pipeline(&config, providers, &store, processing_date)?
    };

    print_build_summary(&ctx, &outputs, &store)?;
    Ok(())
}

fn print_build_summary(ctx: &RunContext, outputs: &IndexOutputs, store: &TableStore) -> Result<()> {
    let metrics = outputs.metrics()?;

    println!();
    println!("=== Index Build ===");
    println!("Run:             {}", ctx.run_id);
    println!("Processing date: {}", ctx.processing_date);
    if let Some(source) = ctx.source {
        println!("Source:          {source:?}");
    }
    println!("Excluded:        {} tickers without shares data", ctx.excluded_tickers.len());
    for meta in &outputs.tables {
        println!("  {:<10} {:>8} rows  {}", meta.name, meta.rows, &meta.content_hash[..16]);
    }
    match (metrics.first_date, metrics.last_date) {
        (Some(first), Some(last)) => println!("Period:          {first} to {last}"),
        _ => println!("Period:          no data"),
    }
    if let Some(ret) = metrics.cumulative_return_pct {
        println!("Return:          {ret:+.2}%");
    }
    println!("Store:           {}", store.root().display());
    Ok(())
}

fn run_show(args: &StoreArgs, date: Option<NaiveDate>) -> Result<()> {
    init_logging(args.log_level, None, today())?;
    let store = TableStore::open(&args.store_dir)?;
    let outputs = load_outputs(&store)
        .with_context(|| format!("no index in {}; run `hedge-it build` first", args.store_dir.display()))?;

    let index = outputs.index_rows()?;
    if index.is_empty() {
        println!("The stored index is empty.");
        return Ok(());
    }

    println!("=== Index ===");
    print!("{}", render_bar_chart(&index, CHART_WIDTH));

    let metrics = outputs.metrics()?;
    println!();
    if let Some(ret) = metrics.cumulative_return_pct {
        println!("Cumulative return:   {ret:+.2}%");
    }
    println!("Max drawdown:        {:.2}%", metrics.max_drawdown_pct);
    println!("Composition changes: {}", metrics.composition_change_days.len());

    let selected = match date {
        Some(d) => d,
        None => index[0].date,
    };
    let rows = outputs.composition_on(selected)?;
    println!();
    println!("=== Composition on {selected} ===");
    if rows.is_empty() {
        println!("No constituents on this date.");
    }
    for row in rows {
        println!(
            "{:<8} {:<32} {:>18.0} {:>10.2}",
            row.ticker, row.display_name, row.market_cap, row.close
        );
    }
    Ok(())
}

fn run_export(
    args: &StoreArgs,
    date: Option<NaiveDate>,
    processing_date: NaiveDate,
    out: &Path,
) -> Result<()> {
    init_logging(args.log_level, None, processing_date)?;
    let store = TableStore::open(&args.store_dir)?;
    let outputs = load_outputs(&store)
        .with_context(|| format!("no index in {}; run `hedge-it build` first", args.store_dir.display()))?;

    for path in save_exports(&outputs, date, processing_date, out)? {
        println!("Wrote {}", path.display());
    }
    Ok(())
}
