//! `quickshop inventory`: validate inventory.csv

use quickshop_core::PipelineExecutor;
use quickshop_core::pipeline::InventoryReport;

use super::{DirArgs, load_config};
use crate::error::CliError;

/// Arguments for the inventory command
#[derive(Debug, Clone, Default)]
pub struct InventoryArgs {
    pub dirs: DirArgs,
    pub dry_run: bool,
    pub verbose: bool,
}

pub fn execute_inventory(args: &InventoryArgs) -> Result<InventoryReport, CliError> {
    let mut config = load_config(&args.dirs, args.verbose)?;
    if args.dry_run {
        config = config.with_dry_run(true);
    }
    let executor = PipelineExecutor::new(config)?;
    Ok(executor.check_inventory()?)
}

/// Handle the inventory command
pub fn handle_inventory(args: &InventoryArgs) -> Result<(), CliError> {
    let report = execute_inventory(args)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
