//! Error types for loading and aggregating tables.
//!
//! Unparseable field values never show up here: they are excluded by
//! [`crate::analysis::aggregator::retain_parsed`] before grouping.

use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort an analysis run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Input file missing or unreadable.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV structure (unterminated quotes and the like).
    #[error("malformed CSV in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A named column is absent from the header.
    #[error("column '{column}' not found in {}", .path.display())]
    MissingColumn { column: String, path: PathBuf },

    /// The file does not have the shape the schema describes.
    #[error("schema error: {0}")]
    Schema(String),

    /// Aggregation produced nothing usable (no rows for a year, zero total, ...).
    #[error("degenerate aggregate: {0}")]
    Degenerate(String),

    /// Two sequences fed to a paired formula differ in length.
    #[error("sequence length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    /// An inner join was requested over zero tables.
    #[error("inner join requires at least one table")]
    EmptyJoin,
}

/// Result alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;
