//! Pipeline executor for one processing date

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use super::config::PipelineConfig;
use super::range::{iso_date, normalize_date};
use super::summary::{RunStage, RunSummary, total_revenue};
use crate::error::{EtlError, EtlResult};
use crate::readers::{
    DirContext, read_inventory, read_orders_for_date, read_products, resolve_data_dir,
    resolve_output_dir,
};
use crate::table::{Split, Table};
use crate::transforms::{add_order_date_iso, add_order_total, enrich_with_products};
use crate::validation::{order_schema, validate_table};
use crate::writers::{write_bad_rows_csv, write_parquet_partition, write_summary_json};

/// Output subdirectory for partitions
pub const PROCESSED_DIR: &str = "processed";
/// Output subdirectory for summary files
pub const SUMMARIES_DIR: &str = "summaries";
/// Output subdirectory for quarantined rows
pub const BAD_ROWS_DIR: &str = "bad_rows";

/// Bad-rows file name for products
pub const PRODUCTS_BAD_NAME: &str = "products-bad";
/// Bad-rows file name for inventory
pub const INVENTORY_BAD_NAME: &str = "inventory-bad";

/// Bad-rows file name for a date's orders
pub fn orders_bad_name(date: &str) -> String {
    format!("orders-{date}-bad")
}

/// Everything computed for a date before anything is written
#[derive(Debug, Clone)]
pub struct EnrichedRun {
    /// Processing date, `YYYYMMDD`
    pub date: String,
    /// Enriched orders; `None` when no order survived validation
    pub enriched: Option<Table>,
    /// Parse and validation failures of the order file
    pub order_bad: Table,
    /// Validation failures of the product file
    pub product_bad: Table,
}

impl EnrichedRun {
    pub fn rows(&self) -> usize {
        self.enriched.as_ref().map(Table::len).unwrap_or(0)
    }

    pub fn revenue(&self) -> f64 {
        self.enriched.as_ref().map(total_revenue).unwrap_or(0.0)
    }

    /// Partition value: first row's ISO date, else the ISO run date
    pub fn partition_value(&self) -> EtlResult<String> {
        let first = self
            .enriched
            .as_ref()
            .and_then(|t| t.rows().first())
            .and_then(|row| row.value("order_date_iso").to_text());
        match first {
            Some(iso) => Ok(iso),
            None => iso_date(&self.date),
        }
    }

    /// Last stage entered while enriching
    pub fn final_stage(&self) -> RunStage {
        if self.enriched.is_some() {
            RunStage::Transforming
        } else {
            RunStage::NoValidRows
        }
    }

    fn summary(&self, parquet_path: Option<PathBuf>) -> RunSummary {
        if self.enriched.is_none() {
            return RunSummary::empty(&self.date, self.order_bad.len());
        }
        RunSummary {
            date: self.date.clone(),
            rows: self.rows(),
            revenue: self.revenue(),
            bad_rows: self.order_bad.len(),
            parquet_path,
        }
    }
}

/// Outcome of an inventory check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryReport {
    pub valid: usize,
    pub bad_rows: usize,
    pub bad_rows_path: Option<PathBuf>,
}

/// Pipeline executor bound to resolved data and output directories
pub struct PipelineExecutor {
    config: PipelineConfig,
    data_dir: PathBuf,
    output_dir: PathBuf,
}

impl PipelineExecutor {
    /// Create a new pipeline executor, resolving its directories
    pub fn new(config: PipelineConfig) -> EtlResult<Self> {
        config.validate().map_err(EtlError::Config)?;

        let context = DirContext::from_env(config.data_dir.clone())?;
        let data_dir = resolve_data_dir(&context);
        let output_dir = resolve_output_dir(config.output_dir.as_deref(), &context.cwd);

        debug!(
            data_dir = %data_dir.display(),
            output_dir = %output_dir.display(),
            "Resolved pipeline directories"
        );

        Ok(Self {
            config,
            data_dir,
            output_dir,
        })
    }

    /// Create an executor with fixed directories, skipping resolution
    pub fn with_dirs(
        config: PipelineConfig,
        data_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> EtlResult<Self> {
        config.validate().map_err(EtlError::Config)?;
        Ok(Self {
            config,
            data_dir: data_dir.into(),
            output_dir: output_dir.into(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.output_dir.join(PROCESSED_DIR)
    }

    pub fn summaries_dir(&self) -> PathBuf {
        self.output_dir.join(SUMMARIES_DIR)
    }

    pub fn bad_rows_dir(&self) -> PathBuf {
        self.output_dir.join(BAD_ROWS_DIR)
    }

    fn enter(&self, date: &str, stage: RunStage) {
        info!(stage = stage.name(), "Entering stage");
        if self.config.verbose {
            eprintln!("[{date}] {stage}");
        }
    }

    fn load_products(&self, date: &str) -> EtlResult<Split> {
        self.enter(date, RunStage::ReadingProducts);
        let products = read_products(&self.data_dir)?;
        if !products.bad.is_empty() {
            warn!(bad_rows = products.bad.len(), "Products failed validation");
        }
        Ok(products)
    }

    fn enrich_with(&self, date: &str, products: Split) -> EtlResult<EnrichedRun> {
        self.enter(date, RunStage::ReadingOrders);
        let parsed = read_orders_for_date(
            &self.data_dir,
            date,
            self.config.order_date_format.as_deref(),
        )?;

        self.enter(date, RunStage::Validating);
        let validated = validate_table(parsed.good, &order_schema());

        let mut order_bad = parsed.bad;
        order_bad.extend(validated.bad);

        if validated.good.is_empty() {
            self.enter(date, RunStage::NoValidRows);
            warn!(bad_rows = order_bad.len(), "No valid orders");
            return Ok(EnrichedRun {
                date: date.to_string(),
                enriched: None,
                order_bad,
                product_bad: products.bad,
            });
        }

        self.enter(date, RunStage::Transforming);
        let orders = add_order_total(validated.good);
        let orders = enrich_with_products(orders, &products.good)?;
        let enriched = add_order_date_iso(orders, "order_date", "order_date_iso")?;

        Ok(EnrichedRun {
            date: date.to_string(),
            enriched: Some(enriched),
            order_bad,
            product_bad: products.bad,
        })
    }

    /// Read, validate and transform one date without writing anything
    pub fn enrich_for_date(&self, date: &str) -> EtlResult<EnrichedRun> {
        let date = normalize_date(date)?;
        let products = self.load_products(&date)?;
        self.enrich_with(&date, products)
    }

    /// Run the pipeline for one date
    ///
    /// Under dry-run the returned summary is identical except that
    /// `parquet_path` is absent, and nothing is created on disk.
    pub fn run_for_date(&self, date: &str) -> EtlResult<RunSummary> {
        let date = normalize_date(date)?;
        let run_id = Uuid::new_v4();
        let _span = info_span!(
            "pipeline_run",
            run_id = %run_id,
            date = %date,
            dry_run = self.config.dry_run
        )
        .entered();

        let start = Instant::now();
        info!(data_dir = %self.data_dir.display(), "Starting pipeline");
        if self.config.verbose {
            eprintln!("Pipeline run: {run_id}");
            if self.config.dry_run {
                eprintln!("DRY RUN MODE - no files will be written");
            }
        }

        let products = self.load_products(&date)?;
        if !self.config.dry_run {
            write_bad_rows_csv(&products.bad, PRODUCTS_BAD_NAME, &self.bad_rows_dir())?;
        }

        let run = self.enrich_with(&date, products)?;

        let terminal = run.final_stage().is_terminal();
        let summary = if self.config.dry_run {
            run.summary(None)
        } else {
            if !terminal {
                self.enter(&date, RunStage::Writing);
            }
            self.write_outputs(&run)?
        };

        if !terminal {
            self.enter(&date, RunStage::Done);
        }
        info!(
            rows = summary.rows,
            revenue = summary.revenue,
            bad_rows = summary.bad_rows,
            duration_ms = start.elapsed().as_millis() as u64,
            "Pipeline completed"
        );
        Ok(summary)
    }

    fn write_outputs(&self, run: &EnrichedRun) -> EtlResult<RunSummary> {
        let bad_name = orders_bad_name(&run.date);
        let enriched = match &run.enriched {
            Some(table) => table,
            None => {
                write_bad_rows_csv(&run.order_bad, &bad_name, &self.bad_rows_dir())?;
                return Ok(run.summary(None));
            }
        };

        let partition_value = run.partition_value()?;
        let parquet_path =
            write_parquet_partition(enriched, &partition_value, &self.processed_dir())?;

        let summary = run.summary(Some(parquet_path));
        write_summary_json(
            &summary.to_summary_file(&partition_value),
            &self.summaries_dir(),
        )?;
        write_bad_rows_csv(&run.order_bad, &bad_name, &self.bad_rows_dir())?;

        Ok(summary)
    }

    /// Validate `inventory.csv` and quarantine its bad rows
    pub fn check_inventory(&self) -> EtlResult<InventoryReport> {
        let split = read_inventory(&self.data_dir)?;
        let bad_rows_path = if self.config.dry_run {
            None
        } else {
            write_bad_rows_csv(&split.bad, INVENTORY_BAD_NAME, &self.bad_rows_dir())?
        };

        Ok(InventoryReport {
            valid: split.good.len(),
            bad_rows: split.bad.len(),
            bad_rows_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("products.csv"),
            "product_id,product_name,category,price\n1001,Widget,tools,10.0\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("orders_20251025.csv"),
            "order_id,order_date,product_id,qty,unit_price\n1,2025-10-25,1001,2,10.0\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_executor_rejects_invalid_config() {
        let config = PipelineConfig::new().with_order_date_format(Some(String::new()));
        assert!(PipelineExecutor::with_dirs(config, "data", "output").is_err());
    }

    #[test]
    fn test_output_layout() {
        let executor =
            PipelineExecutor::with_dirs(PipelineConfig::new(), "/data", "/out").unwrap();
        assert_eq!(executor.processed_dir(), PathBuf::from("/out/processed"));
        assert_eq!(executor.summaries_dir(), PathBuf::from("/out/summaries"));
        assert_eq!(executor.bad_rows_dir(), PathBuf::from("/out/bad_rows"));
        assert_eq!(orders_bad_name("20251025"), "orders-20251025-bad");
    }

    #[test]
    fn test_enrich_for_date() {
        let data = fixture();
        let out = TempDir::new().unwrap();
        let executor =
            PipelineExecutor::with_dirs(PipelineConfig::new(), data.path(), out.path()).unwrap();

        let run = executor.enrich_for_date("2025-10-25").unwrap();
        assert_eq!(run.date, "20251025");
        assert_eq!(run.rows(), 1);
        assert_eq!(run.revenue(), 20.0);
        assert_eq!(run.partition_value().unwrap(), "2025-10-25");
        assert_eq!(run.final_stage(), RunStage::Transforming);
        assert!(!run.final_stage().is_terminal());
        assert!(fs::read_dir(out.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_no_valid_rows_ends_run_at_terminal_stage() {
        let data = fixture();
        fs::write(
            data.path().join("orders_20251025.csv"),
            "order_id,order_date,product_id,qty,unit_price
1,2025-10-25,1001,-2,10.0
",
        )
        .unwrap();
        let out = TempDir::new().unwrap();
        let executor =
            PipelineExecutor::with_dirs(PipelineConfig::new(), data.path(), out.path()).unwrap();

        let run = executor.enrich_for_date("20251025").unwrap();
        assert_eq!(run.final_stage(), RunStage::NoValidRows);
        assert!(run.final_stage().is_terminal());

        let summary = executor.run_for_date("20251025").unwrap();
        assert_eq!(summary, RunSummary::empty("20251025", 1));
        assert!(
            out.path()
                .join(BAD_ROWS_DIR)
                .join(orders_bad_name("20251025"))
                .with_extension("csv")
                .exists()
        );
        assert!(!out.path().join(PROCESSED_DIR).exists());
    }

    #[test]
    fn test_partition_value_falls_back_to_run_date() {
        let run = EnrichedRun {
            date: "20251025".to_string(),
            enriched: None,
            order_bad: Table::new(),
            product_bad: Table::new(),
        };
        assert_eq!(run.partition_value().unwrap(), "2025-10-25");
        assert_eq!(run.revenue(), 0.0);
    }

    #[test]
    fn test_check_inventory_dry_run() {
        let data = TempDir::new().unwrap();
        fs::write(
            data.path().join("inventory.csv"),
            "product_id,warehouse_id,stock_on_hand,last_restock_date\n1,W1,-3,2025-10-01\n",
        )
        .unwrap();
        let out = TempDir::new().unwrap();
        let config = PipelineConfig::new().with_dry_run(true);
        let executor = PipelineExecutor::with_dirs(config, data.path(), out.path()).unwrap();

        let report = executor.check_inventory().unwrap();
        assert_eq!(report.valid, 0);
        assert_eq!(report.bad_rows, 1);
        assert!(report.bad_rows_path.is_none());
        assert!(!out.path().join(BAD_ROWS_DIR).exists());
    }
}
