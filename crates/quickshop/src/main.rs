//! QuickShop ETL command-line interface

mod commands;
mod error;
mod logging;

use clap::{Parser, Subcommand};

use commands::DirArgs;
use commands::inventory::{InventoryArgs, handle_inventory};
use commands::report::{ReportArgs, handle_report};
use commands::run::{RunArgs, handle_run};
use logging::LogFormat;

#[derive(Parser, Debug)]
#[command(
    name = "quickshop",
    version,
    about = "Per-date batch ETL for QuickShop order data"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    /// Echo stage progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process one date or an inclusive date range
    Run {
        /// First processing date (YYYYMMDD or YYYY-MM-DD)
        #[arg(long)]
        start_date: String,

        /// Last processing date; defaults to the start date
        #[arg(long)]
        end_date: Option<String>,

        #[command(flatten)]
        dirs: DirArgs,

        /// Compute everything but write nothing
        #[arg(long)]
        dry_run: bool,

        /// Extra attempts for a failing date
        #[arg(long)]
        retries: Option<u32>,

        /// Seconds to wait between attempts
        #[arg(long)]
        retry_delay_secs: Option<u64>,
    },
    /// Print category revenue and top products for one date
    Report {
        /// Processing date (YYYYMMDD or YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Number of products to list
        #[arg(long, default_value_t = 10)]
        top: usize,

        #[command(flatten)]
        dirs: DirArgs,
    },
    /// Validate inventory.csv and quarantine its bad rows
    Inventory {
        #[command(flatten)]
        dirs: DirArgs,

        /// Validate without writing the quarantine file
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_format);

    let verbose = cli.verbose;
    let result = match cli.command {
        Commands::Run {
            start_date,
            end_date,
            dirs,
            dry_run,
            retries,
            retry_delay_secs,
        } => handle_run(&RunArgs {
            start_date,
            end_date,
            dirs,
            dry_run,
            retries,
            retry_delay_secs,
            verbose,
        }),
        Commands::Report { date, top, dirs } => handle_report(&ReportArgs {
            date,
            top,
            dirs,
            verbose,
        }),
        Commands::Inventory { dirs, dry_run } => handle_inventory(&InventoryArgs {
            dirs,
            dry_run,
            verbose,
        }),
    };

    result.map_err(|e| anyhow::anyhow!(e.user_message()))
}
