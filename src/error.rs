// src/error.rs
use std::path::PathBuf;

use thiserror::Error;

/// Everything the acquisition pipeline can fail with.
///
/// Per-field CSV conversion failures are deliberately absent: those are
/// recovered in-place with sentinel values (see `process`) and never
/// surface as errors.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("could not create or access data directory {path}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("transfer failed for {url}")]
    Transfer {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unknown region code {0:?}")]
    InvalidRegion(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no canonical archive for year {year}")]
    NoCanonicalArchive { year: u16 },

    #[error("archive {path}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
