use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// DataLoadError – fatal problems while building the emissions table
// ---------------------------------------------------------------------------

/// Everything that can go wrong turning an input file into an
/// [`EmissionsTable`](super::model::EmissionsTable).
///
/// A load either yields a complete table or one of these; no partial table
/// is ever handed out.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed parquet: {0}")]
    Parquet(String),

    #[error("required column '{column}' is missing")]
    MissingColumn { column: String },

    #[error("column '{column}' has type {found}, which cannot be read as {expected}")]
    UnsupportedColumnType {
        column: String,
        found: String,
        expected: String,
    },

    #[error("row {row}, column '{column}': '{value}' is not a valid value")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },
}

impl From<parquet::errors::ParquetError> for DataLoadError {
    fn from(e: parquet::errors::ParquetError) -> Self {
        DataLoadError::Parquet(e.to_string())
    }
}

impl From<arrow::error::ArrowError> for DataLoadError {
    fn from(e: arrow::error::ArrowError) -> Self {
        DataLoadError::Parquet(e.to_string())
    }
}
