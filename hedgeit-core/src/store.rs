//! Parquet-backed table store.
//!
//! Layout: `{root}/{name}.parquet` with a `{name}.meta.json` sidecar.
//!
//! - Create-or-replace writes only; a table is whatever its last write produced
//! - Atomic writes (write to .tmp, rename into place)
//! - Sidecar records row count, columns, and a BLAKE3 hash of the Parquet bytes
//! - Table names are validated before they touch the filesystem
//!
//! Single writer: concurrent runs against one store directory are unsupported.

use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid table name '{0}': expected [A-Za-z_][A-Za-z0-9_]*")]
    InvalidName(String),

    #[error("table not found: {0}")]
    NotFound(String),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parquet error: {0}")]
    Parquet(#[from] PolarsError),

    #[error("metadata error: {0}")]
    Meta(#[from] serde_json::Error),
}

/// Metadata sidecar for a stored table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMeta {
    pub name: String,
    pub rows: usize,
    pub columns: Vec<String>,
    /// BLAKE3 hex digest of the Parquet file contents.
    pub content_hash: String,
    pub written_at: NaiveDateTime,
}

/// True for names of the form `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A directory of named Parquet tables.
#[derive(Debug, Clone)]
pub struct TableStore {
    root: PathBuf,
}

impl TableStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn checked(name: &str) -> Result<&str, StoreError> {
        if is_valid_table_name(name) {
            Ok(name)
        } else {
            Err(StoreError::InvalidName(name.to_string()))
        }
    }

    fn table_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.parquet"))
    }

    fn meta_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.meta.json"))
    }

    /// Create or replace a table with the contents of `df`.
    pub fn replace(&self, name: &str, df: &DataFrame) -> Result<TableMeta, StoreError> {
        let name = Self::checked(name)?;

        let mut bytes = Vec::new();
        ParquetWriter::new(&mut bytes).finish(&mut df.clone())?;
        let content_hash = blake3::hash(&bytes).to_hex().to_string();

        let path = self.table_path(name);
        let tmp_path = path.with_extension("parquet.tmp");
        fs::write(&tmp_path, &bytes)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            // Clean up temp file on rename failure
            let _ = fs::remove_file(&tmp_path);
            e
        })?;

        let meta = TableMeta {
            name: name.to_string(),
            rows: df.height(),
            columns: df.get_column_names().iter().map(|c| c.to_string()).collect(),
            content_hash,
            written_at: chrono::Local::now().naive_local(),
        };
        let meta_path = self.meta_path(name);
        let meta_tmp = meta_path.with_extension("json.tmp");
        fs::write(&meta_tmp, serde_json::to_string_pretty(&meta)?)?;
        fs::rename(&meta_tmp, &meta_path)?;

        debug!(table = name, rows = meta.rows, hash = %meta.content_hash, "table replaced");
        Ok(meta)
    }

    pub fn exists(&self, name: &str) -> bool {
        is_valid_table_name(name) && self.table_path(name).is_file()
    }

    /// Read a whole table.
    pub fn read(&self, name: &str) -> Result<DataFrame, StoreError> {
        let name = Self::checked(name)?;
        let path = self.table_path(name);
        if !path.is_file() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        let file = fs::File::open(path)?;
        Ok(ParquetReader::new(file).finish()?)
    }

    /// Start a lazy query over a table.
    pub fn query(&self, name: &str) -> Result<LazyFrame, StoreError> {
        let name = Self::checked(name)?;
        let path = self.table_path(name);
        if !path.is_file() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        Ok(LazyFrame::scan_parquet(path, Default::default())?)
    }

    /// Metadata sidecar of a table.
    pub fn meta(&self, name: &str) -> Result<TableMeta, StoreError> {
        let name = Self::checked(name)?;
        let path = self.meta_path(name);
        if !path.is_file() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    /// Names of all stored tables, sorted.
    pub fn table_names(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("parquet") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if is_valid_table_name(stem) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample(values: &[f64]) -> DataFrame {
        df!(
            "ticker" => values.iter().map(|v| format!("T{v}")).collect::<Vec<_>>(),
            "close" => values,
        )
        .unwrap()
    }

    #[test]
    fn name_validation() {
        assert!(is_valid_table_name("stocks"));
        assert!(is_valid_table_name("_tmp1"));
        assert!(is_valid_table_name("top_mcap"));
        assert!(!is_valid_table_name(""));
        assert!(!is_valid_table_name("1abc"));
        assert!(!is_valid_table_name("a-b"));
        assert!(!is_valid_table_name("../etc"));
        assert!(!is_valid_table_name("drop table;"));
    }

    #[test]
    fn replace_then_read_back() {
        let dir = TempDir::new().unwrap();
        let store = TableStore::open(dir.path()).unwrap();

        let meta = store.replace("stocks", &sample(&[1.0, 2.0])).unwrap();
        assert_eq!(meta.rows, 2);
        assert_eq!(meta.columns, vec!["ticker", "close"]);

        let df = store.read("stocks").unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(store.meta("stocks").unwrap(), meta);
        assert!(!dir.path().join("stocks.parquet.tmp").exists());
    }

    #[test]
    fn replace_overwrites_never_appends() {
        let dir = TempDir::new().unwrap();
        let store = TableStore::open(dir.path()).unwrap();

        store.replace("index", &sample(&[1.0, 2.0, 3.0])).unwrap();
        store.replace("index", &sample(&[4.0])).unwrap();

        assert_eq!(store.read("index").unwrap().height(), 1);
    }

    #[test]
    fn identical_content_identical_hash() {
        let dir = TempDir::new().unwrap();
        let store = TableStore::open(dir.path()).unwrap();

        let a = store.replace("a", &sample(&[1.0, 2.0])).unwrap();
        let b = store.replace("b", &sample(&[1.0, 2.0])).unwrap();
        let c = store.replace("c", &sample(&[1.0, 2.5])).unwrap();

        assert_eq!(a.content_hash, b.content_hash);
        assert_ne!(a.content_hash, c.content_hash);
    }

    #[test]
    fn query_filters_lazily() {
        let dir = TempDir::new().unwrap();
        let store = TableStore::open(dir.path()).unwrap();
        store.replace("prices", &sample(&[1.0, 5.0, 9.0])).unwrap();

        let df = store
            .query("prices")
            .unwrap()
            .filter(col("close").gt(lit(2.0)))
            .collect()
            .unwrap();
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn missing_and_invalid_tables() {
        let dir = TempDir::new().unwrap();
        let store = TableStore::open(dir.path()).unwrap();

        assert!(matches!(store.read("nope"), Err(StoreError::NotFound(_))));
        assert!(matches!(store.read("bad name"), Err(StoreError::InvalidName(_))));
        assert!(matches!(
            store.replace("x;y", &sample(&[1.0])),
            Err(StoreError::InvalidName(_))
        ));
        assert!(!store.exists("nope"));
    }

    #[test]
    fn table_names_sorted() {
        let dir = TempDir::new().unwrap();
        let store = TableStore::open(dir.path()).unwrap();
        store.replace("top_mcap", &sample(&[1.0])).unwrap();
        store.replace("index", &sample(&[1.0])).unwrap();

        assert_eq!(store.table_names().unwrap(), vec!["index", "top_mcap"]);
    }

    #[test]
    fn empty_frame_round_trips_schema() {
        let dir = TempDir::new().unwrap();
        let store = TableStore::open(dir.path()).unwrap();
        let empty = sample(&[]);

        let meta = store.replace("empty", &empty).unwrap();
        assert_eq!(meta.rows, 0);
        let back = store.read("empty").unwrap();
        assert_eq!(back.height(), 0);
        assert_eq!(back.width(), 2);
    }
}
