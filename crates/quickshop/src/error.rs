//! CLI error types

use quickshop_core::EtlError;
use thiserror::Error;

/// Errors surfaced by the `quickshop` command handlers
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Etl(#[from] EtlError),

    #[error("Processing failed for: {}", .0.join(", "))]
    DatesFailed(Vec<String>),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    /// Get a user-friendly error message with hints
    pub fn user_message(&self) -> String {
        match self {
            CliError::Etl(e) => e.user_message(),
            CliError::DatesFailed(dates) => format!(
                "Processing failed for {} date(s): {}\n\nHint: The per-date errors are in the JSON output above.",
                dates.len(),
                dates.join(", ")
            ),
            _ => self.to_string(),
        }
    }
}
