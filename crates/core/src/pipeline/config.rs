//! Pipeline configuration types

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use super::range::RetryPolicy;
use crate::error::{EtlError, EtlResult};
use crate::readers::DEFAULT_DATE_FORMAT;

/// Main pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Data directory override (resolved automatically when unset)
    pub data_dir: Option<PathBuf>,
    /// Output root (defaults to `./output`)
    pub output_dir: Option<PathBuf>,
    /// Strict chrono format for `order_date`; `None` infers every value
    pub order_date_format: Option<String>,
    /// Compute everything but write nothing
    pub dry_run: bool,
    /// Echo stage progress to stderr
    pub verbose: bool,
    /// Extra attempts for a failing date in a range run
    pub retries: u32,
    /// Pause between attempts
    pub retry_delay_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            output_dir: None,
            order_date_format: Some(DEFAULT_DATE_FORMAT.to_string()),
            dry_run: false,
            verbose: false,
            retries: 0,
            retry_delay_secs: RetryPolicy::DEFAULT_DELAY_SECS,
        }
    }
}

impl PipelineConfig {
    /// Create a new pipeline config
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a config from a TOML file; absent keys keep their defaults
    pub fn from_toml_file(path: &Path) -> EtlResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EtlError::io_with_path(path, "reading config file", e))?;
        Self::from_toml_str(&content)
            .map_err(|e| EtlError::Config(format!("{}: {e}", path.display())))
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Set the data directory
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Set the output directory
    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set the strict order date format
    pub fn with_order_date_format(mut self, format: Option<String>) -> Self {
        self.order_date_format = format;
        self
    }

    /// Enable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set retry behaviour for range runs
    pub fn with_retries(mut self, retries: u32, delay_secs: u64) -> Self {
        self.retries = retries;
        self.retry_delay_secs = delay_secs;
        self
    }

    /// Retry policy for range runs
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            delay: Duration::from_secs(self.retry_delay_secs),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if let Some(format) = &self.order_date_format {
            if format.trim().is_empty() {
                return Err("order_date_format cannot be empty".to_string());
            }
            if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                return Err(format!("Invalid order_date_format: {format}"));
            }
        }

        if let Some(dir) = &self.output_dir {
            if dir.as_os_str().is_empty() {
                return Err("output_dir cannot be empty".to_string());
            }
        }

        Ok(())
    }
}
