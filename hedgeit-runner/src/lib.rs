//! hedge-it runner: index build orchestration on top of `hedgeit-core`.
//!
//! This crate provides:
//! - Run configuration (TOML + CLI overrides) and logging setup
//! - An explicit per-run context so stages are not rebuilt within a run
//! - Stage orchestration with persistence to the table store
//! - Summary metrics and CSV/Markdown export

pub mod config;
pub mod context;
pub mod export;
pub mod logging;
pub mod metrics;
pub mod runner;

pub use config::{ConfigError, IndexConfig, LogLevel, PREVIEW_STOCK_LIMIT};
pub use context::RunContext;
pub use export::{frame_to_csv, generate_report, render_bar_chart, save_exports};
pub use logging::{init_logging, log_file_name, LoggingError};
pub use metrics::{DailyChange, IndexMetrics};
pub use runner::{
    build_data, build_index, load_outputs, run_pipeline, IndexOutputs, Providers, RunError,
};
