//! Per-date pipeline orchestration
//!
//! A run for one processing date reads the product reference file and the
//! date's order file, validates orders, enriches the valid ones and writes:
//!
//! - `processed/date=<YYYY-MM-DD>/data.parquet`
//! - `summaries/summary_<YYYY-MM-DD>.json`
//! - `bad_rows/orders-<YYYYMMDD>-bad.csv` and `bad_rows/products-bad.csv`
//!
//! # Example
//!
//! ```rust,ignore
//! use quickshop_core::pipeline::{PipelineConfig, PipelineExecutor};
//!
//! let config = PipelineConfig::new()
//!     .with_data_dir("/srv/quickshop/data")
//!     .with_output_dir("/srv/quickshop/output");
//!
//! let executor = PipelineExecutor::new(config)?;
//! let summary = executor.run_for_date("20251025")?;
//! println!("{} rows, revenue {}", summary.rows, summary.revenue);
//! ```
//!
//! # Dry Run
//!
//! With `dry_run` set every stage still runs and the summary carries the same
//! counts, but no file or directory is created.
//!
//! # Date ranges
//!
//! [`run_date_range`] runs each day of a [`DateRange`] in order, retrying a
//! failing day per [`RetryPolicy`] and recording failures instead of
//! stopping.

mod config;
mod executor;
mod range;
mod summary;

pub use config::PipelineConfig;
pub use executor::{
    BAD_ROWS_DIR, EnrichedRun, INVENTORY_BAD_NAME, InventoryReport, PROCESSED_DIR,
    PRODUCTS_BAD_NAME, PipelineExecutor, SUMMARIES_DIR, orders_bad_name,
};
pub use range::{DateRange, RetryPolicy, iso_date, normalize_date, run_date_range};
pub use summary::{DateOutcome, RunStage, RunSummary, total_revenue};

use crate::error::EtlResult;

/// Run the pipeline for one date with the given configuration
///
/// This is a convenience function for simple pipeline execution.
pub fn run_for_date(config: PipelineConfig, date: &str) -> EtlResult<RunSummary> {
    let executor = PipelineExecutor::new(config)?;
    executor.run_for_date(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_run_for_date_dry_run() {
        let temp = TempDir::new().unwrap();
        let data = temp.path().join("data");
        std::fs::create_dir(&data).unwrap();
        std::fs::write(
            data.join("products.csv"),
            "product_id,product_name,category,price\n1001,Widget,tools,10.0\n",
        )
        .unwrap();
        std::fs::write(
            data.join("orders_20251025.csv"),
            "order_id,order_date,product_id,qty,unit_price\n1,2025-10-25,1001,3,10.0\n",
        )
        .unwrap();

        let output = temp.path().join("output");
        let config = PipelineConfig::new()
            .with_data_dir(&data)
            .with_output_dir(&output)
            .with_dry_run(true);

        let summary = run_for_date(config, "20251025").unwrap();
        assert_eq!(summary.rows, 1);
        assert_eq!(summary.revenue, 30.0);
        assert!(summary.parquet_path.is_none());
        assert!(!output.exists());
    }
}
