//! Error types for the flood report pipeline.
//!
//! Structural failures (`NotFound`, `Schema`, `Parse`) abort a run.
//! `InsufficientData` is recoverable: callers degrade the affected report
//! block instead of failing. `EmptySection` is raised at assembly.

use std::path::PathBuf;
use thiserror::Error;

/// Pipeline errors.
#[derive(Error, Debug)]
pub enum FloodError {
    /// A declared data source does not exist.
    #[error("{dataset} dataset not found: {}", path.display())]
    NotFound { dataset: String, path: PathBuf },

    /// A required column is absent from a dataset.
    #[error("{dataset} dataset is missing required column '{column}'")]
    Schema { dataset: String, column: String },

    /// A field could not be converted to its semantic type.
    #[error("{dataset} dataset, row {row}, column '{column}': invalid value '{value}' ({reason})")]
    Parse {
        dataset: String,
        row: usize,
        column: String,
        value: String,
        reason: String,
    },

    /// Too few records for a statistic.
    #[error("insufficient data for {analysis}: need at least {required} values, found {found}")]
    InsufficientData {
        analysis: String,
        required: usize,
        found: usize,
    },

    /// A report section has no content.
    #[error("report section '{section}' is empty")]
    EmptySection { section: String },

    /// CSV reader error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FloodError {
    /// Whether the error only affects a single analysis block.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FloodError::InsufficientData { .. })
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, FloodError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message_names_row_and_column() {
        let err = FloodError::Parse {
            dataset: "primary".to_string(),
            row: 3,
            column: "displaced".to_string(),
            value: "N/A".to_string(),
            reason: "not a number".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("row 3"));
        assert!(msg.contains("'displaced'"));
        assert!(msg.contains("N/A"));
    }

    #[test]
    fn test_only_insufficient_data_is_recoverable() {
        let insufficient = FloodError::InsufficientData {
            analysis: "correlation".to_string(),
            required: 2,
            found: 1,
        };
        assert!(insufficient.is_recoverable());

        let empty = FloodError::EmptySection {
            section: "City Analysis".to_string(),
        };
        assert!(!empty.is_recoverable());
    }
}
