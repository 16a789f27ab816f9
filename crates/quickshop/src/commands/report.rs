//! `quickshop report`: revenue aggregations for one date

use quickshop_core::transforms::{compute_daily_category_revenue, top_n_products_by_revenue};
use quickshop_core::{CategoryRevenue, PipelineExecutor, ProductRevenue, normalize_date};
use serde::Serialize;

use super::{DirArgs, load_config};
use crate::error::CliError;

/// Arguments for the report command
#[derive(Debug, Clone, Default)]
pub struct ReportArgs {
    pub date: String,
    pub top: usize,
    pub dirs: DirArgs,
    pub verbose: bool,
}

/// Aggregated view of one date's enriched orders
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateReport {
    pub date: String,
    pub rows: usize,
    pub revenue: f64,
    pub bad_rows: usize,
    pub categories: Vec<CategoryRevenue>,
    pub top_products: Vec<ProductRevenue>,
}

/// Enrich the date's orders and aggregate them; never writes files
pub fn execute_report(args: &ReportArgs) -> Result<DateReport, CliError> {
    if args.top == 0 {
        return Err(CliError::InvalidArgument(
            "--top must be at least 1".to_string(),
        ));
    }
    let date = normalize_date(&args.date)?;

    let config = load_config(&args.dirs, args.verbose)?.with_dry_run(true);
    let executor = PipelineExecutor::new(config)?;
    let run = executor.enrich_for_date(&date)?;

    let (categories, top_products) = match &run.enriched {
        Some(table) => (
            compute_daily_category_revenue(table)?,
            top_n_products_by_revenue(table, args.top)?,
        ),
        None => (Vec::new(), Vec::new()),
    };

    Ok(DateReport {
        rows: run.rows(),
        revenue: run.revenue(),
        bad_rows: run.order_bad.len(),
        date,
        categories,
        top_products,
    })
}

/// Handle the report command
pub fn handle_report(args: &ReportArgs) -> Result<(), CliError> {
    let report = execute_report(args)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
