//! Arrow conversion and Parquet encoding of tables

use std::io::Cursor;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;

use crate::error::{EtlError, EtlResult};
use crate::table::{Table, Value};

/// Value recorded under the `created_by` key of written files
pub const CREATED_BY: &str = "quickshop-etl";

/// Arrow type chosen for a column from the values it holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int64,
    Float64,
    Timestamp,
    Utf8,
}

impl ColumnType {
    pub fn data_type(self) -> DataType {
        match self {
            ColumnType::Int64 => DataType::Int64,
            ColumnType::Float64 => DataType::Float64,
            ColumnType::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
            ColumnType::Utf8 => DataType::Utf8,
        }
    }
}

/// Infer a column's type from its non-null values
///
/// Integers alone give `Int64`, any float promotes to `Float64`, date/times
/// alone give `Timestamp`; everything else (including all-null) is `Utf8`.
pub fn infer_column_type<'a>(values: impl Iterator<Item = &'a Value>) -> ColumnType {
    let (mut ints, mut floats, mut datetimes, mut other) = (false, false, false, false);
    for value in values {
        match value {
            Value::Null => {}
            Value::Int(_) => ints = true,
            Value::Float(_) => floats = true,
            Value::DateTime(_) => datetimes = true,
            Value::Str(_) => other = true,
        }
    }

    let numeric = ints || floats;
    match (numeric, datetimes, other) {
        (_, _, true) | (true, true, _) => ColumnType::Utf8,
        (false, true, false) => ColumnType::Timestamp,
        (true, false, false) if floats => ColumnType::Float64,
        (true, false, false) => ColumnType::Int64,
        (false, false, false) => ColumnType::Utf8,
    }
}

fn build_array(table: &Table, column: &str, kind: ColumnType) -> ArrayRef {
    let values = table.column_values(column);
    match kind {
        ColumnType::Int64 => Arc::new(Int64Array::from(
            values.map(Value::as_i64).collect::<Vec<_>>(),
        )),
        ColumnType::Float64 => Arc::new(Float64Array::from(
            values.map(Value::as_f64).collect::<Vec<_>>(),
        )),
        ColumnType::Timestamp => Arc::new(TimestampMicrosecondArray::from(
            values
                .map(|v| v.as_datetime().map(|dt| dt.and_utc().timestamp_micros()))
                .collect::<Vec<_>>(),
        )),
        ColumnType::Utf8 => Arc::new(StringArray::from(
            values.map(Value::to_text).collect::<Vec<_>>(),
        )),
    }
}

/// Convert a table into a single Arrow record batch
pub fn table_to_record_batch(table: &Table) -> EtlResult<RecordBatch> {
    if table.columns().is_empty() {
        return Err(EtlError::Parquet("table has no columns".to_string()));
    }

    let mut fields = Vec::with_capacity(table.columns().len());
    let mut arrays = Vec::with_capacity(table.columns().len());
    for column in table.columns() {
        let kind = infer_column_type(table.column_values(column));
        fields.push(Field::new(column.as_str(), kind.data_type(), true));
        arrays.push(build_array(table, column, kind));
    }

    let schema = Arc::new(Schema::new(fields));
    RecordBatch::try_new(schema, arrays)
        .map_err(|e| EtlError::Parquet(format!("record batch build failed: {e}")))
}

fn writer_properties() -> WriterProperties {
    let created_by = KeyValue {
        key: "created_by".to_string(),
        value: Some(CREATED_BY.to_string()),
    };
    WriterProperties::builder()
        .set_key_value_metadata(Some(vec![created_by]))
        .build()
}

/// Encode a table as Parquet bytes
pub fn encode_parquet(table: &Table) -> EtlResult<Vec<u8>> {
    let batch = table_to_record_batch(table)?;
    let mut cursor = Cursor::new(Vec::<u8>::new());
    let mut writer = ArrowWriter::try_new(&mut cursor, batch.schema(), Some(writer_properties()))
        .map_err(|e| EtlError::Parquet(format!("parquet writer init failed: {e}")))?;
    writer
        .write(&batch)
        .map_err(|e| EtlError::Parquet(format!("parquet write failed: {e}")))?;
    writer
        .close()
        .map_err(|e| EtlError::Parquet(format!("parquet close failed: {e}")))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Row;
    use arrow::array::Array;
    use chrono::NaiveDate;

    #[test]
    fn test_infer_column_type() {
        let dt = Value::DateTime(
            NaiveDate::from_ymd_opt(2025, 10, 25)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        );
        let infer = |values: Vec<Value>| infer_column_type(values.iter());

        assert_eq!(infer(vec![Value::Int(1), Value::Null]), ColumnType::Int64);
        assert_eq!(infer(vec![Value::Int(1), Value::Float(1.5)]), ColumnType::Float64);
        assert_eq!(infer(vec![dt.clone(), Value::Null]), ColumnType::Timestamp);
        assert_eq!(infer(vec![dt, Value::Int(1)]), ColumnType::Utf8);
        assert_eq!(infer(vec![Value::Int(1), Value::from("a")]), ColumnType::Utf8);
        assert_eq!(infer(vec![Value::Null]), ColumnType::Utf8);
    }

    #[test]
    fn test_table_to_record_batch() {
        let table = Table::from_rows(vec![
            Row::new().with("id", 1).with("price", 2).with("name", "a"),
            Row::new().with("id", 2).with("price", 2.5).with("name", Value::Null),
        ]);
        let batch = table_to_record_batch(&table).unwrap();

        assert_eq!(batch.num_rows(), 2);
        let schema = batch.schema();
        assert_eq!(schema.field(0).data_type(), &DataType::Int64);
        assert_eq!(schema.field(1).data_type(), &DataType::Float64);
        assert_eq!(schema.field(2).data_type(), &DataType::Utf8);
        assert_eq!(batch.column(2).null_count(), 1);
    }

    #[test]
    fn test_encode_rejects_columnless_table() {
        assert!(encode_parquet(&Table::new()).is_err());
    }
}
