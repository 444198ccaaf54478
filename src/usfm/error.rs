//! Errors at the crate boundary
//!
//! Parsing and writing never fail; these cover reading inputs, decoding JSON, loading
//! configuration and picking an output format.

use crate::usfm::formats::FormatError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UsfmError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid verse objects JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Format(#[from] FormatError),
}

pub type Result<T> = std::result::Result<T, UsfmError>;
