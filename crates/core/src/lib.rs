//! QuickShop ETL Core - per-date batch processing of shop order data
//!
//! Provides:
//! - Loosely typed tables with good/bad row splits
//! - CSV readers with strict-then-permissive date parsing
//! - Schema validation of order, product and inventory records
//! - Order totals, the product join and revenue aggregations
//! - Atomic Parquet, JSON and CSV output
//! - A per-date pipeline executor and a date-range driver

pub mod error;
pub mod pipeline;
pub mod readers;
pub mod table;
pub mod transforms;
pub mod validation;
pub mod writers;

// Re-export commonly used types
pub use error::{EtlError, EtlResult};
pub use pipeline::{
    DateOutcome, DateRange, EnrichedRun, PipelineConfig, PipelineExecutor, RetryPolicy,
    RunStage, RunSummary, normalize_date, run_date_range,
};
pub use table::{Rejected, Row, Split, Table, Value};
pub use transforms::{CategoryRevenue, ProductRevenue};
pub use validation::{RecordSchema, validate_table};
