//! Output writers
//!
//! Every file goes through [`write_atomic`], so readers of the output tree
//! only ever see complete files.

pub mod atomic;
pub mod columnar;

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EtlError, EtlResult};
use crate::table::Table;

pub use atomic::write_atomic;
pub use columnar::{
    CREATED_BY, ColumnType, encode_parquet, infer_column_type, table_to_record_batch,
};

/// File name of a partition's data file
pub const PARTITION_FILE: &str = "data.parquet";

/// Content of a persisted summary file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryFile {
    pub date: Option<String>,
    pub rows: usize,
    pub revenue: f64,
}

/// Write `table` to `processed_dir/date=<partition_value>/data.parquet`
pub fn write_parquet_partition(
    table: &Table,
    partition_value: &str,
    processed_dir: &Path,
) -> EtlResult<PathBuf> {
    let target = processed_dir
        .join(format!("date={partition_value}"))
        .join(PARTITION_FILE);
    let bytes = encode_parquet(table)?;
    write_atomic(&target, |w| Ok(w.write_all(&bytes)?))?;
    info!(path = %target.display(), rows = table.len(), "Wrote parquet partition");
    Ok(target)
}

/// Write `summaries_dir/summary_<date>.json`, or `summary_run.json` without a date
pub fn write_summary_json(summary: &SummaryFile, summaries_dir: &Path) -> EtlResult<PathBuf> {
    let stem = summary.date.as_deref().unwrap_or("run");
    let target = summaries_dir.join(format!("summary_{stem}.json"));
    write_atomic(&target, |w| Ok(serde_json::to_writer_pretty(w, summary)?))?;
    info!(path = %target.display(), "Wrote summary");
    Ok(target)
}

/// Write quarantined rows to `bad_rows_dir/<name>.csv`
///
/// An empty table writes nothing, not even the directory, and returns `None`.
pub fn write_bad_rows_csv(
    table: &Table,
    name: &str,
    bad_rows_dir: &Path,
) -> EtlResult<Option<PathBuf>> {
    if table.is_empty() {
        return Ok(None);
    }

    let target = bad_rows_dir.join(format!("{name}.csv"));
    write_atomic(&target, |w| {
        let mut writer = csv::Writer::from_writer(w);
        writer
            .write_record(table.columns())
            .map_err(|e| EtlError::csv(&target, e))?;
        for row in table.rows() {
            let record = table
                .columns()
                .iter()
                .map(|c| row.value(c).to_text().unwrap_or_default());
            writer
                .write_record(record)
                .map_err(|e| EtlError::csv(&target, e))?;
        }
        writer.flush()?;
        Ok(())
    })?;

    info!(path = %target.display(), rows = table.len(), "Wrote bad rows");
    Ok(Some(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Row, VALIDATION_ERROR_COLUMN, Value};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::fs;
    use tempfile::TempDir;

    fn sample() -> Table {
        Table::from_rows(vec![
            Row::new().with("order_id", 1).with("order_total", 20.0),
            Row::new().with("order_id", 2).with("order_total", 5.5),
        ])
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_write_parquet_partition_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = write_parquet_partition(&sample(), "2025-10-25", dir.path()).unwrap();
        assert_eq!(path, dir.path().join("date=2025-10-25").join("data.parquet"));

        let file = fs::File::open(&path).unwrap();
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).unwrap();
        let created_by = builder
            .metadata()
            .file_metadata()
            .key_value_metadata()
            .and_then(|kv| kv.iter().find(|k| k.key == "created_by"))
            .and_then(|k| k.value.clone());
        assert_eq!(created_by.as_deref(), Some(CREATED_BY));

        let rows: usize = builder
            .build()
            .unwrap()
            .map(|batch| batch.unwrap().num_rows())
            .sum();
        assert_eq!(rows, 2);
    }

    #[test]
    fn test_write_partition_twice_leaves_one_file() {
        let dir = TempDir::new().unwrap();
        write_parquet_partition(&sample(), "2025-10-25", dir.path()).unwrap();
        write_parquet_partition(&sample(), "2025-10-25", dir.path()).unwrap();
        assert_eq!(
            file_names(&dir.path().join("date=2025-10-25")),
            vec!["data.parquet"]
        );
    }

    #[test]
    fn test_write_summary_json_twice_leaves_one_file() {
        let dir = TempDir::new().unwrap();
        let summary = SummaryFile {
            date: Some("2025-10-25".to_string()),
            rows: 3,
            revenue: 42.5,
        };
        write_summary_json(&summary, dir.path()).unwrap();
        let path = write_summary_json(&summary, dir.path()).unwrap();

        assert_eq!(file_names(dir.path()), vec!["summary_2025-10-25.json"]);
        let read: SummaryFile = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(read, summary);
    }

    #[test]
    fn test_write_summary_without_date() {
        let dir = TempDir::new().unwrap();
        let summary = SummaryFile {
            date: None,
            rows: 0,
            revenue: 0.0,
        };
        let path = write_summary_json(&summary, dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "summary_run.json");
    }

    #[test]
    fn test_write_bad_rows_csv() {
        let dir = TempDir::new().unwrap();
        let table = Table::from_rows(vec![
            Row::new()
                .with("order_id", 1)
                .with("qty", -1)
                .with(VALIDATION_ERROR_COLUMN, "qty: too small"),
            Row::new().with("order_id", 2).with("qty", Value::Null),
        ]);

        let path = write_bad_rows_csv(&table, "orders-20251025-bad", dir.path())
            .unwrap()
            .unwrap();
        assert_eq!(path.file_name().unwrap(), "orders-20251025-bad.csv");
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "order_id,qty,_error\n1,-1,qty: too small\n2,,\n"
        );
    }

    #[test]
    fn test_write_empty_bad_rows_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let bad_dir = dir.path().join("bad_rows");
        let result = write_bad_rows_csv(&Table::with_columns(["a"]), "x", &bad_dir).unwrap();
        assert!(result.is_none());
        assert!(!bad_dir.exists());
    }
}
