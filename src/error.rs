//! Error taxonomy for the classification engine.
//!
//! Every variant carries the context needed to act on it (parameter name,
//! row index or file path) without looking at engine internals.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, LithologyError>;

#[derive(Debug, Error)]
pub enum LithologyError {
    /// Empty or invalid rule set, or a rule referencing an unknown parameter.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Depth input to the unit grouper is not strictly increasing.
    #[error("Depth ordering error at row {row}: depth {depth} does not exceed previous depth {previous}")]
    DataOrdering { row: usize, previous: f64, depth: f64 },

    /// Template spreadsheet not found.
    #[error("Template file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    /// I/O failure while writing the output workbook.
    #[error("Write error for '{}': {message}", path.display())]
    Write { path: PathBuf, message: String },

    /// Template exists but its package or sheet XML cannot be read.
    #[error("Malformed template '{}': {message}", path.display())]
    MalformedTemplate { path: PathBuf, message: String },

    /// Required columns absent from the input dataset, or an unusable record.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl LithologyError {
    pub(crate) fn write(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Write {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::MalformedTemplate {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// True for the configuration category (fail-fast, caller must fix inputs).
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
