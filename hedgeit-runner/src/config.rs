//! Run configuration for an index build.
//!
//! Loaded from an optional TOML file, then overridden field by field by the
//! CLI. The resolved config is validated once and passed by reference for the
//! rest of the run.

use hedgeit_core::data::{default_workers, FetchSettings};
use hedgeit_core::pipeline::{RankerConfig, DEFAULT_TOP_N, DEFAULT_WINDOW_DAYS, PREVIEW_TOP_N};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Tickers considered by the preview build.
pub const PREVIEW_STOCK_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Log verbosity, named the way operators type it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        };
        f.write_str(name)
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            other => Err(ConfigError::Invalid(format!(
                "unknown log level '{other}' (expected DEBUG, INFO, WARNING, ERROR)"
            ))),
        }
    }
}

/// Everything an index build needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub log_level: LogLevel,

    /// Polygon API key; required for live runs only.
    #[serde(skip_serializing)]
    pub polygon_api_key: Option<String>,

    /// Maximum tickers taken from the listing.
    pub stock_limit: usize,

    /// Constituents per date.
    pub top_n: usize,

    /// Constituents per date in the preview build.
    pub preview_top_n: usize,

    /// Trailing calendar-day window kept before ranking.
    pub window_days: i64,

    /// Days of price history requested from the provider.
    pub history_days: u32,

    /// Exchange codes to list (MIC, e.g. `XNYS`).
    pub exchanges: Vec<String>,

    /// Tickers per price-history request.
    pub chunk_size: usize,

    /// Fan-out workers; `None` means ten per core.
    pub workers: Option<usize>,

    /// Table store directory.
    pub store_dir: PathBuf,

    /// Directory for per-day log files; stdout only when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            polygon_api_key: None,
            stock_limit: 2000,
            top_n: DEFAULT_TOP_N,
            preview_top_n: PREVIEW_TOP_N,
            window_days: DEFAULT_WINDOW_DAYS,
            history_days: 30,
            exchanges: vec!["XNYS".to_string()],
            chunk_size: 50,
            workers: None,
            store_dir: PathBuf::from("stocks_db"),
            log_dir: None,
        }
    }
}

impl IndexConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string. Missing fields take their defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Narrow the build to the preview variant: `preview_top_n` (default 2) of
    /// the first 10 tickers.
    pub fn into_preview(self) -> Self {
        Self {
            top_n: self.preview_top_n,
            stock_limit: self.stock_limit.min(PREVIEW_STOCK_LIMIT),
            ..self
        }
    }

    /// Reject settings no run could succeed with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stock_limit == 0 {
            return Err(ConfigError::Invalid("stock_limit must be at least 1".into()));
        }
        if self.top_n == 0 {
            return Err(ConfigError::Invalid("top_n must be at least 1".into()));
        }
        if self.preview_top_n == 0 {
            return Err(ConfigError::Invalid("preview_top_n must be at least 1".into()));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be at least 1".into()));
        }
        if self.history_days == 0 {
            return Err(ConfigError::Invalid("history_days must be at least 1".into()));
        }
        if self.window_days < 0 {
            return Err(ConfigError::Invalid("window_days cannot be negative".into()));
        }
        if self.workers == Some(0) {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.exchanges.is_empty() || self.exchanges.iter().any(|x| x.trim().is_empty()) {
            return Err(ConfigError::Invalid("at least one exchange code is required".into()));
        }
        Ok(())
    }

    /// The Polygon key, or an error naming how to supply it.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.polygon_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingCredential(
                "Polygon API key (--polygon-api-key or POLYGON_API_KEY)",
            ))
    }

    pub fn ranker(&self) -> RankerConfig {
        RankerConfig {
            top_n: self.top_n,
            window_days: self.window_days,
        }
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            exchanges: self.exchanges.clone(),
            stock_limit: self.stock_limit,
            chunk_size: self.chunk_size,
            history_days: self.history_days,
            workers: self.workers.unwrap_or_else(default_workers),
        }
    }

    /// Deterministic fingerprint of the settings, credentials excluded.
    ///
    /// Two runs with the same fingerprint on the same inputs write identical tables.
    pub fn fingerprint(&self) -> String {
        // polygon_api_key is skip_serializing, so it never reaches the hash
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex()[..16].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = IndexConfig::default();
        assert_eq!(config.stock_limit, 2000);
        assert_eq!(config.top_n, 100);
        assert_eq!(config.window_days, 30);
        assert_eq!(config.chunk_size, 50);
        assert_eq!(config.exchanges, vec!["XNYS"]);
        assert_eq!(config.store_dir, PathBuf::from("stocks_db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = IndexConfig::from_toml(
            r#"
            log_level = "DEBUG"
            stock_limit = 25
            exchanges = ["XNYS", "XNAS"]
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.stock_limit, 25);
        assert_eq!(config.exchanges.len(), 2);
        assert_eq!(config.top_n, 100);
    }

    #[test]
    fn bad_toml_is_parse_error() {
        let err = IndexConfig::from_toml("stock_limit = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = IndexConfig::from_file(Path::new("/nonexistent/hedge_it.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn validate_rejects_zero_limits() {
        let mut config = IndexConfig {
            top_n: 0,
            ..IndexConfig::default()
        };
        assert!(config.validate().is_err());

        config.top_n = 5;
        config.exchanges.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn api_key_required_and_blank_rejected() {
        let mut config = IndexConfig::default();
        assert!(matches!(
            config.require_api_key(),
            Err(ConfigError::MissingCredential(_))
        ));

        config.polygon_api_key = Some("   ".into());
        assert!(config.require_api_key().is_err());

        config.polygon_api_key = Some("key".into());
        assert_eq!(config.require_api_key().unwrap(), "key");
    }

    #[test]
    fn log_level_parsing() {
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("Debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("TRACE".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Warning.as_filter(), "warn");
    }

    #[test]
    fn preview_narrows_limits() {
        let preview = IndexConfig::default().into_preview();
        assert_eq!(preview.top_n, 2);
        assert_eq!(preview.stock_limit, 10);
    }

    #[test]
    fn preview_limit_comes_from_file() {
        let config = IndexConfig::from_toml(
            r#"
            top_n = 50
            preview_top_n = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.top_n, 50);
        assert_eq!(config.into_preview().top_n, 4);
    }

    #[test]
    fn fingerprint_ignores_api_key() {
        let a = IndexConfig::default();
        let b = IndexConfig {
            polygon_api_key: Some("secret".into()),
            ..IndexConfig::default()
        };
        let c = IndexConfig {
            top_n: 50,
            ..IndexConfig::default()
        };
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
