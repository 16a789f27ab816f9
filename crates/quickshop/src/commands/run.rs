//! `quickshop run`: process one date or an inclusive date range

use std::collections::BTreeMap;

use quickshop_core::{DateOutcome, DateRange, PipelineExecutor, run_date_range};
use tracing::info;

use super::{DirArgs, load_config};
use crate::error::CliError;

/// Arguments for the run command
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub start_date: String,
    pub end_date: Option<String>,
    pub dirs: DirArgs,
    pub dry_run: bool,
    pub retries: Option<u32>,
    pub retry_delay_secs: Option<u64>,
    pub verbose: bool,
}

/// Run every date and collect the per-date outcomes
pub fn execute_run(args: &RunArgs) -> Result<BTreeMap<String, DateOutcome>, CliError> {
    let range = DateRange::new(&args.start_date, args.end_date.as_deref())?;

    let mut config = load_config(&args.dirs, args.verbose)?;
    if args.dry_run {
        config = config.with_dry_run(true);
    }
    let retries = args.retries.unwrap_or(config.retries);
    let delay = args.retry_delay_secs.unwrap_or(config.retry_delay_secs);
    config = config.with_retries(retries, delay);

    let executor = PipelineExecutor::new(config)?;
    info!(
        start = %range.start(),
        end = %range.end(),
        dry_run = executor.config().dry_run,
        "Starting range run"
    );

    Ok(run_date_range(
        &executor,
        &range,
        &executor.config().retry_policy(),
    ))
}

/// Handle the run command
///
/// Prints the date-keyed outcome map as JSON and fails if any date failed.
pub fn handle_run(args: &RunArgs) -> Result<(), CliError> {
    let results = execute_run(args)?;
    println!("{}", serde_json::to_string_pretty(&results)?);

    let failed: Vec<String> = results
        .iter()
        .filter(|(_, outcome)| outcome.is_failed())
        .map(|(date, _)| date.clone())
        .collect();

    if failed.is_empty() {
        Ok(())
    } else {
        Err(CliError::DatesFailed(failed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn data_dir() -> TempDir {
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

    fn args(data: &TempDir, output: &TempDir, start: &str, end: Option<&str>) -> RunArgs {
        RunArgs {
            start_date: start.to_string(),
            end_date: end.map(str::to_string),
            dirs: DirArgs {
                data_dir: Some(data.path().to_path_buf()),
                output_dir: Some(output.path().join("out")),
                config: None,
            },
            dry_run: true,
            retries: Some(0),
            retry_delay_secs: Some(0),
            verbose: false,
        }
    }

    #[test]
    fn test_execute_run_single_date() {
        let data = data_dir();
        let output = TempDir::new().unwrap();

        let results = execute_run(&args(&data, &output, "2025-10-25", None)).unwrap();
        let summary = results["20251025"].summary().unwrap();
        assert_eq!(summary.rows, 1);
        assert_eq!(summary.revenue, 20.0);
        assert!(!output.path().join("out").exists());
    }

    #[test]
    fn test_handle_run_reports_failed_dates() {
        let data = data_dir();
        let output = TempDir::new().unwrap();

        let err = handle_run(&args(&data, &output, "20251025", Some("20251026"))).unwrap_err();
        match err {
            CliError::DatesFailed(dates) => assert_eq!(dates, vec!["20251026"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_start_date() {
        let data = data_dir();
        let output = TempDir::new().unwrap();

        let err = execute_run(&args(&data, &output, "25/10/2025", None)).unwrap_err();
        assert!(matches!(err, CliError::Etl(_)));
    }
}
