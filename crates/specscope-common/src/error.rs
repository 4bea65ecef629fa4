//! Error type shared by every SpecScope component.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecscopeError {
    #[error("file not found: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing required columns {missing:?}; found {found:?}")]
    MissingColumns {
        missing: Vec<String>,
        found: Vec<String>,
    },
    #[error("row {row}: missing or invalid timestamp {value:?}")]
    InvalidTimestamp { row: usize, value: String },
    #[error("row {row}: invalid value {value:?} for column {column}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },
    #[error("row {row}: missing value for column {column}")]
    MissingValue { row: usize, column: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("simulator failed: {0}")]
    Simulator(String),
    #[error("model error: {0}")]
    Model(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("dataset is empty")]
    EmptyDataset,
}

impl SpecscopeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = SpecscopeError> = std::result::Result<T, E>;
