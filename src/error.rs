//! Error types for SDDS
//!
//! Provides a unified error type for all codec, layout and page-store operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using SddsError
pub type Result<T> = std::result::Result<T, SddsError>;

/// Unified error type for SDDS operations
#[derive(Debug, Error)]
pub enum SddsError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stream missing, unreadable, truncated, or failing the magic/version check
    #[error("Unable to open {}: {reason}", path.display())]
    Open { path: PathBuf, reason: String },

    /// Flush or close of the underlying stream failed
    #[error("Unable to close {}: {source}", path.display())]
    Close {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // State Machine Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Data Errors
    // -------------------------------------------------------------------------
    /// Malformed or out-of-range scalar, header, or page
    #[error("Format error: {0}")]
    Format(String),

    #[error("Cannot convert {value} to {target}")]
    TypeMismatch { value: String, target: &'static str },

    #[error("Inconsistent page: {0}")]
    InconsistentPage(String),

    // -------------------------------------------------------------------------
    // Layout Errors
    // -------------------------------------------------------------------------
    #[error("Duplicate {kind} definition: {name}")]
    DuplicateDefinition { kind: &'static str, name: String },

    #[error("Invalid {kind} name {name}")]
    UnknownName { kind: &'static str, name: String },

    // -------------------------------------------------------------------------
    // Index Errors
    // -------------------------------------------------------------------------
    #[error("Invalid page {0}")]
    InvalidPage(usize),

    #[error("Invalid row {0}")]
    InvalidRow(usize),

    #[error("Row {row} is beyond the fixed row count {capacity}")]
    RowBounds { row: usize, capacity: usize },

    // -------------------------------------------------------------------------
    // Handle Registry Errors
    // -------------------------------------------------------------------------
    #[error("All SDDS indices are in use (max index {max_index})")]
    ResourceExhausted { max_index: usize },

    #[error("Index {0} is already in use")]
    HandleInUse(usize),

    #[error("Index {index} must be between 0 and {max_index}")]
    HandleOutOfRange { index: usize, max_index: usize },
}

impl SddsError {
    pub(crate) fn unknown_parameter(name: &str) -> Self {
        SddsError::UnknownName {
            kind: "parameter",
            name: name.to_string(),
        }
    }

    pub(crate) fn unknown_array(name: &str) -> Self {
        SddsError::UnknownName {
            kind: "array",
            name: name.to_string(),
        }
    }

    pub(crate) fn unknown_column(name: &str) -> Self {
        SddsError::UnknownName {
            kind: "column",
            name: name.to_string(),
        }
    }

    /// True for the `IndexError` family (page/row out of range)
    pub fn is_index_error(&self) -> bool {
        matches!(
            self,
            SddsError::InvalidPage(_) | SddsError::InvalidRow(_) | SddsError::RowBounds { .. }
        )
    }
}
