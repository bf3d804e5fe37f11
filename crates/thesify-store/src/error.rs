use std::path::PathBuf;

use thesify_core::CatalogError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("unsupported file format: {0} (expected .csv or .parquet)")]
    UnsupportedFormat(PathBuf),

    #[error("{0}: file is empty or has no header")]
    EmptyTable(PathBuf),

    #[error("{path}: missing '{column}' column")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{path}: null '{column}' at row {row}")]
    NullValue {
        path: PathBuf,
        column: String,
        row: usize,
    },

    #[error("invalid category catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("category label '{0}' collides with a dataset column")]
    ColumnCollision(String),

    #[error("records disagree on passthrough columns (record {0})")]
    InconsistentColumns(usize),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}
