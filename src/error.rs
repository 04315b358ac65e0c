//! Error types for the reconciliation library.
//!
//! Matching and field resolution never fail; only configuration and the
//! dataset I/O around the engine can produce errors.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration problems detected before any matching begins.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("unknown match profile '{0}' (expected conservative, balanced or aggressive)")]
    UnknownProfile(String),

    #[error("artist_weight ({artist}) and title_weight ({title}) must be non-negative and sum to 1.0")]
    InvalidWeights { artist: f64, title: f64 },

    #[error("{name} must lie in [0, 1], got {value}")]
    OutOfRange { name: &'static str, value: f64 },

    #[error("invalid config file: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("unsupported file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
