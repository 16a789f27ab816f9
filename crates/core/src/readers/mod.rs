//! Record parser
//!
//! Loads the flat input files of the data directory into [`Table`]s and
//! splits off rows whose dates cannot be read.

pub mod dates;
pub mod discovery;

use std::path::Path;

use tracing::{debug, info};

use crate::error::{EtlError, EtlResult};
use crate::table::{Row, Split, Table, Value};
use crate::validation::{inventory_schema, product_schema, validate_table};

pub use dates::{
    DEFAULT_DATE_FORMAT, FLEXIBLE_PARSE_FAILURE, coerce_datetime, parse_date_column,
    parse_flexible, parse_with_format,
};
pub use discovery::{
    DirContext, PROJECT_MARKERS, SANDBOX_DATA_DIR, find_order_file, find_project_root,
    resolve_data_dir, resolve_output_dir,
};

/// Product reference file name
pub const PRODUCTS_FILE: &str = "products.csv";

/// Inventory snapshot file name
pub const INVENTORY_FILE: &str = "inventory.csv";

/// Load a delimited file with a header row
///
/// Rows shorter than the header get nulls for their missing cells; cells
/// beyond the header are ignored.
pub fn read_csv_table(path: &Path) -> EtlResult<Table> {
    if !path.is_file() {
        return Err(EtlError::FileNotFound(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| EtlError::csv(path, e))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| EtlError::csv(path, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut table = Table::with_columns(headers.iter().cloned());
    for record in reader.records() {
        let record = record.map_err(|e| EtlError::csv(path, e))?;
        let mut row = Row::new();
        for (i, header) in headers.iter().enumerate() {
            let value = record.get(i).map(Value::from_raw).unwrap_or(Value::Null);
            row.set(header.as_str(), value);
        }
        table.push(row);
    }

    debug!(path = %path.display(), rows = table.len(), columns = table.columns().len(), "Loaded CSV");
    Ok(table)
}

/// Read and validate `products.csv`
pub fn read_products(data_dir: &Path) -> EtlResult<Split> {
    let table = read_csv_table(&data_dir.join(PRODUCTS_FILE))?;
    let split = validate_table(table, &product_schema());
    info!(
        valid = split.good.len(),
        bad_rows = split.bad.len(),
        "Read products"
    );
    Ok(split)
}

/// Read `inventory.csv`, parse restock dates and validate
///
/// The bad side holds date-parse failures followed by validation failures.
pub fn read_inventory(data_dir: &Path) -> EtlResult<Split> {
    let table = read_csv_table(&data_dir.join(INVENTORY_FILE))?;
    let parsed = parse_date_column(table, "last_restock_date", Some(DEFAULT_DATE_FORMAT))?;
    let validated = validate_table(parsed.good, &inventory_schema());

    let mut bad = parsed.bad;
    bad.extend(validated.bad);

    info!(
        valid = validated.good.len(),
        bad_rows = bad.len(),
        "Read inventory"
    );
    Ok(Split {
        good: validated.good,
        bad,
    })
}

/// Locate and load the order file for `date`, parsing `order_date`
pub fn read_orders_for_date(data_dir: &Path, date: &str, format: Option<&str>) -> EtlResult<Split> {
    let path = find_order_file(data_dir, date)?;
    info!(date, path = %path.display(), "Reading orders");
    let table = read_csv_table(&path)?;
    parse_date_column(table, "order_date", format)
}
