//! Table schema contract shared by the pipeline stages and the table store.
//!
//! Every stage emits frames with exactly these columns, in this order. The
//! store does not migrate schemas; a table is whatever its last write produced,
//! so stages validate what they read.

use polars::prelude::*;

/// Column names used across all tables.
pub mod cols {
    pub const DATE: &str = "date";
    pub const TICKER: &str = "ticker";
    pub const OPEN: &str = "open";
    pub const CLOSE: &str = "close";
    pub const LOW: &str = "low";
    pub const HIGH: &str = "high";
    pub const VOLUME: &str = "volume";
    pub const SHARES_OUTSTANDING: &str = "shares_outstanding";
    pub const INDUSTRY: &str = "industry";
    pub const SECTOR: &str = "sector";
    pub const DISPLAY_NAME: &str = "display_name";
    pub const MARKET_CAP: &str = "market_cap";
    pub const STOCK_COUNT: &str = "stock_count";
    pub const INDEX_VALUE: &str = "index_value";
    pub const VALUE: &str = "value";
}

/// Names of the persisted tables.
pub mod tables {
    pub const STOCKS: &str = "stocks";
    pub const TOP_MCAP: &str = "top_mcap";
    pub const INDEX: &str = "index";
}

use cols::*;

/// Schemas for each frame the pipeline produces.
pub struct TableSchema;

impl TableSchema {
    /// Long-form price observations (Row Reshaper output).
    pub fn prices() -> Schema {
        Schema::from_iter(vec![
            Field::new(DATE.into(), DataType::Date),
            Field::new(TICKER.into(), DataType::String),
            Field::new(OPEN.into(), DataType::Float64),
            Field::new(CLOSE.into(), DataType::Float64),
            Field::new(LOW.into(), DataType::Float64),
            Field::new(HIGH.into(), DataType::Float64),
            Field::new(VOLUME.into(), DataType::Float64),
        ])
    }

    /// Shares-outstanding snapshot, one row per ticker.
    pub fn shares() -> Schema {
        Schema::from_iter(vec![
            Field::new(TICKER.into(), DataType::String),
            Field::new(SHARES_OUTSTANDING.into(), DataType::Float64),
            Field::new(INDUSTRY.into(), DataType::String),
            Field::new(SECTOR.into(), DataType::String),
            Field::new(DISPLAY_NAME.into(), DataType::String),
        ])
    }

    /// Prices joined with shares (`stocks` table).
    pub fn stocks() -> Schema {
        Schema::from_iter(vec![
            Field::new(DATE.into(), DataType::Date),
            Field::new(TICKER.into(), DataType::String),
            Field::new(OPEN.into(), DataType::Float64),
            Field::new(CLOSE.into(), DataType::Float64),
            Field::new(LOW.into(), DataType::Float64),
            Field::new(HIGH.into(), DataType::Float64),
            Field::new(VOLUME.into(), DataType::Float64),
            Field::new(SHARES_OUTSTANDING.into(), DataType::Float64),
            Field::new(INDUSTRY.into(), DataType::String),
            Field::new(SECTOR.into(), DataType::String),
            Field::new(DISPLAY_NAME.into(), DataType::String),
            Field::new(MARKET_CAP.into(), DataType::Float64),
        ])
    }

    /// Top-N constituents per date (`top_mcap` table).
    pub fn constituents() -> Schema {
        Schema::from_iter(vec![
            Field::new(DATE.into(), DataType::Date),
            Field::new(TICKER.into(), DataType::String),
            Field::new(DISPLAY_NAME.into(), DataType::String),
            Field::new(SECTOR.into(), DataType::String),
            Field::new(MARKET_CAP.into(), DataType::Float64),
            Field::new(CLOSE.into(), DataType::Float64),
        ])
    }

    /// Equal-weighted index level per date (`index` table).
    pub fn index() -> Schema {
        Schema::from_iter(vec![
            Field::new(DATE.into(), DataType::Date),
            Field::new(STOCK_COUNT.into(), DataType::UInt32),
            Field::new(INDEX_VALUE.into(), DataType::Float64),
        ])
    }

    /// Constituents left-joined with the index.
    pub fn composition() -> Schema {
        Schema::from_iter(vec![
            Field::new(DATE.into(), DataType::Date),
            Field::new(TICKER.into(), DataType::String),
            Field::new(DISPLAY_NAME.into(), DataType::String),
            Field::new(SECTOR.into(), DataType::String),
            Field::new(MARKET_CAP.into(), DataType::Float64),
            Field::new(CLOSE.into(), DataType::Float64),
            Field::new(STOCK_COUNT.into(), DataType::UInt32),
            Field::new(INDEX_VALUE.into(), DataType::Float64),
            Field::new(VALUE.into(), DataType::Float64),
        ])
    }

    /// Column names of a schema, in order.
    pub fn column_names(schema: &Schema) -> Vec<PlSmallStr> {
        schema.iter_names().cloned().collect()
    }

    /// A zero-row frame carrying the given schema.
    pub fn empty(schema: &Schema) -> DataFrame {
        DataFrame::empty_with_schema(schema)
    }

    /// Validate that a frame carries every column of `expected` with the right type.
    pub fn validate(df: &DataFrame, expected: &Schema) -> Result<(), SchemaError> {
        let actual = df.schema();

        for field in expected.iter_fields() {
            let actual_dtype = actual
                .get(field.name())
                .ok_or_else(|| SchemaError::MissingColumn(field.name().to_string()))?;
            if actual_dtype != field.dtype() {
                return Err(SchemaError::TypeMismatch {
                    column: field.name().to_string(),
                    expected: field.dtype().clone(),
                    actual: actual_dtype.clone(),
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("type mismatch in column {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },
}
