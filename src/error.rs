// src/error.rs

use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while materializing the dataset. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("dataset path {0:?} does not exist")]
    NotFound(PathBuf),

    #[error("no readable parquet partitions under {0:?}")]
    NoPartitions(PathBuf),

    #[error("invalid glob pattern for {path:?}: {source}")]
    Pattern {
        path: PathBuf,
        #[source]
        source: glob::PatternError,
    },

    #[error("failed to open {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read parquet file {path:?}: {source}")]
    Parquet {
        path: PathBuf,
        #[source]
        source: ParquetError,
    },

    #[error("required column `{0}` is missing from the dataset")]
    MissingColumn(String),

    #[error(transparent)]
    Arrow(#[from] ArrowError),
}

/// Failures of a query against an already loaded dataset.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unknown column `{0}`")]
    UnknownColumn(String),

    #[error(transparent)]
    Arrow(#[from] ArrowError),
}
