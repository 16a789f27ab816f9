//! Error types for ETL operations
//!
//! Per-row problems (unparseable dates, schema violations) are never
//! errors: those rows are quarantined. Everything here aborts the run for
//! the date and propagates to the caller, which decides whether to retry.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during a pipeline run
#[derive(Error, Debug)]
pub enum EtlError {
    /// Required input file missing
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// No order file matched the requested date
    #[error("No order file for date {date} in {}", dir.display())]
    OrderFileNotFound { date: String, dir: PathBuf },

    /// A column the stage depends on is absent from the table
    #[error("Column '{column}' not found ({context})")]
    MissingColumn {
        column: String,
        context: &'static str,
    },

    /// Reference data has more than one product for a key
    #[error("Join integrity violated: {count} products share product_id {product_id}")]
    JoinCardinality { product_id: i64, count: usize },

    /// Date argument is not a real calendar date
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Delimited file could not be read or written
    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Columnar encoding failed
    #[error("Parquet error: {0}")]
    Parquet(String),

    /// IO error with path context
    #[error("IO error with {}: {message}", path.display())]
    IoWithPath {
        path: PathBuf,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for ETL operations
pub type EtlResult<T> = Result<T, EtlError>;

impl EtlError {
    /// Create a missing-column error
    pub fn missing_column(column: impl Into<String>, context: &'static str) -> Self {
        Self::MissingColumn {
            column: column.into(),
            context,
        }
    }

    /// Create an IO error with path context
    pub fn io_with_path(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::IoWithPath {
            path: path.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a CSV error for a file
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    /// Check if this error is recoverable (can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, EtlError::Io(_) | EtlError::IoWithPath { .. })
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            EtlError::FileNotFound(path) => {
                format!(
                    "File not found: {}\n\nHint: Check that the file exists and --data-dir points at the right folder.",
                    path.display()
                )
            }
            EtlError::OrderFileNotFound { date, dir } => {
                format!(
                    "No order file for {date} in {}\n\nHint: Order files must contain the date (YYYYMMDD) and 'order' in their name.",
                    dir.display()
                )
            }
            EtlError::MissingColumn { column, context } => {
                format!(
                    "Column '{column}' not found ({context})\n\nHint: Check the header row of the input file."
                )
            }
            EtlError::JoinCardinality { product_id, count } => {
                format!(
                    "{count} products share product_id {product_id}\n\nHint: products.csv must have exactly one row per product_id."
                )
            }
            EtlError::InvalidDate(input) => {
                format!("Invalid date: {input}\n\nHint: Use YYYYMMDD or YYYY-MM-DD.")
            }
            EtlError::Config(msg) => {
                format!("Configuration error: {msg}\n\nHint: Check your pipeline configuration file.")
            }
            _ => self.to_string(),
        }
    }
}

impl From<parquet::errors::ParquetError> for EtlError {
    fn from(err: parquet::errors::ParquetError) -> Self {
        EtlError::Parquet(err.to_string())
    }
}

impl From<arrow::error::ArrowError> for EtlError {
    fn from(err: arrow::error::ArrowError) -> Self {
        EtlError::Parquet(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EtlError::OrderFileNotFound {
            date: "20251025".to_string(),
            dir: PathBuf::from("/data"),
        };
        assert!(err.to_string().contains("20251025"));
        assert!(err.to_string().contains("/data"));

        let err = EtlError::missing_column("order_date", "date parsing");
        assert!(err.to_string().contains("order_date"));
    }

    #[test]
    fn test_join_cardinality_display() {
        let err = EtlError::JoinCardinality {
            product_id: 1001,
            count: 2,
        };
        assert!(err.to_string().contains("1001"));
        assert!(err.to_string().contains('2'));
    }

    #[test]
    fn test_io_with_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = EtlError::io_with_path("/out/summary.json", "renaming temp file", io_err);
        let display = err.to_string();
        assert!(display.contains("/out/summary.json"));
        assert!(display.contains("renaming temp file"));
    }

    #[test]
    fn test_is_recoverable() {
        let io_err = EtlError::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, "timeout"));
        assert!(io_err.is_recoverable());

        let join_err = EtlError::JoinCardinality {
            product_id: 1,
            count: 3,
        };
        assert!(!join_err.is_recoverable());
    }

    #[test]
    fn test_user_message() {
        let err = EtlError::FileNotFound(PathBuf::from("/data/products.csv"));
        let msg = err.user_message();
        assert!(msg.contains("/data/products.csv"));
        assert!(msg.contains("Hint:"));

        let err = EtlError::InvalidDate("2025-13-40".to_string());
        assert!(err.user_message().contains("Hint:"));
    }
}
