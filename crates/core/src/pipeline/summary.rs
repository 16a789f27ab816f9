//! Run stages and run results

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::table::Table;
use crate::transforms::round2;
use crate::writers::SummaryFile;

/// Stages a single-date run passes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStage {
    /// Load and validate the product reference file
    ReadingProducts,
    /// Locate the date's order file and parse dates
    ReadingOrders,
    /// Check parsed orders against the order schema
    Validating,
    /// Terminal: nothing left to transform
    NoValidRows,
    /// Totals, product join and ISO dates
    Transforming,
    /// Persist partition, summary and bad rows
    Writing,
    /// Run finished
    Done,
}

impl RunStage {
    /// Get all stages in execution order
    pub fn all() -> Vec<Self> {
        vec![
            Self::ReadingProducts,
            Self::ReadingOrders,
            Self::Validating,
            Self::NoValidRows,
            Self::Transforming,
            Self::Writing,
            Self::Done,
        ]
    }

    /// Get stage name
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadingProducts => "reading-products",
            Self::ReadingOrders => "reading-orders",
            Self::Validating => "validating",
            Self::NoValidRows => "no-valid-rows",
            Self::Transforming => "transforming",
            Self::Writing => "writing",
            Self::Done => "done",
        }
    }

    /// Check if the run stops at this stage
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NoValidRows | Self::Done)
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for RunStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RunStage::all()
            .into_iter()
            .find(|stage| stage.name() == s.to_lowercase())
            .ok_or_else(|| format!("Unknown stage: {}", s))
    }
}

/// Result of one date's run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Processing date, `YYYYMMDD`
    pub date: String,
    /// Enriched order rows
    pub rows: usize,
    /// Sum of order totals, two decimals
    pub revenue: f64,
    /// Order rows quarantined by parsing or validation
    pub bad_rows: usize,
    /// Written partition, absent under dry-run or with no valid rows
    pub parquet_path: Option<PathBuf>,
}

impl RunSummary {
    /// Summary for a date with no valid orders
    pub fn empty(date: impl Into<String>, bad_rows: usize) -> Self {
        Self {
            date: date.into(),
            rows: 0,
            revenue: 0.0,
            bad_rows,
            parquet_path: None,
        }
    }

    /// Content of the persisted summary file for a partition
    pub fn to_summary_file(&self, partition_value: &str) -> SummaryFile {
        SummaryFile {
            date: Some(partition_value.to_string()),
            rows: self.rows,
            revenue: self.revenue,
        }
    }
}

/// Sum of `order_total`, rounded; 0.0 without the column
pub fn total_revenue(table: &Table) -> f64 {
    if !table.has_column("order_total") {
        return 0.0;
    }
    round2(
        table
            .column_values("order_total")
            .filter_map(|v| v.as_f64())
            .sum(),
    )
}

/// Per-date entry of a range run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateOutcome {
    Completed(RunSummary),
    Failed { error: String },
}

impl DateOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, DateOutcome::Failed { .. })
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            DateOutcome::Completed(summary) => Some(summary),
            DateOutcome::Failed { .. } => None,
        }
    }
}
