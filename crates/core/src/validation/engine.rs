//! Generic row validation against a [`RecordSchema`]

use std::fmt;

use thiserror::Error;
use tracing::debug;

use super::schema::{FieldKind, FieldSpec, RecordSchema};
use crate::readers::coerce_datetime;
use crate::table::{Rejected, Row, Split, Table, VALIDATION_ERROR_COLUMN, Value};

/// Why a single field failed its constraint
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldViolation {
    #[error("field required")]
    Missing,

    #[error("{}", wrong_type_message(*expected))]
    WrongType { expected: FieldKind },

    #[error("ensure this value is greater than or equal to {}", format_bound(*min))]
    BelowMinimum { min: f64 },

    #[error("ensure this value is less than or equal to {}", format_bound(*max))]
    AboveMaximum { max: f64 },
}

fn wrong_type_message(expected: FieldKind) -> &'static str {
    match expected {
        FieldKind::Integer => "value is not a valid integer",
        FieldKind::Float => "value is not a valid float",
        FieldKind::Text => "str type expected",
        FieldKind::DateTime => "invalid datetime format",
    }
}

/// Integral bounds print without a fractional part
fn format_bound(bound: f64) -> String {
    if bound.fract() == 0.0 && bound.abs() < 1e15 {
        format!("{}", bound as i64)
    } else {
        bound.to_string()
    }
}

/// Every violation found in one row
#[derive(Debug, Clone, PartialEq)]
pub struct RowViolations {
    pub schema: &'static str,
    pub violations: Vec<(&'static str, FieldViolation)>,
}

impl fmt::Display for RowViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.violations.len();
        let plural = if count == 1 { "" } else { "s" };
        write!(f, "{count} validation error{plural} for {}", self.schema)?;
        for (i, (field, violation)) in self.violations.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{field}: {violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RowViolations {}

/// Numeric view of a value under the field's kind, `None` if it does not coerce
fn coerce_numeric(kind: FieldKind, value: &Value) -> Option<Option<f64>> {
    match kind {
        FieldKind::Integer => value.as_i64().map(|i| Some(i as f64)),
        FieldKind::Float => value.as_f64().map(Some),
        FieldKind::Text => match value {
            Value::Null => None,
            _ => Some(None),
        },
        FieldKind::DateTime => coerce_datetime(value).map(|_| None),
    }
}

fn check_field(spec: &FieldSpec, value: &Value) -> Option<FieldViolation> {
    if value.is_null() {
        return spec.required.then_some(FieldViolation::Missing);
    }

    let numeric = match coerce_numeric(spec.kind, value) {
        Some(numeric) => numeric,
        None => {
            return Some(FieldViolation::WrongType {
                expected: spec.kind,
            });
        }
    };

    let n = numeric?;
    if let Some(min) = spec.min.filter(|min| n < *min) {
        return Some(FieldViolation::BelowMinimum { min });
    }
    if let Some(max) = spec.max.filter(|max| n > *max) {
        return Some(FieldViolation::AboveMaximum { max });
    }
    None
}

impl RecordSchema {
    /// Check one row against every field of the schema
    ///
    /// Absent and null fields are treated alike. Columns the schema does not
    /// name are ignored.
    pub fn check_row(&self, row: &Row) -> Result<(), RowViolations> {
        let violations: Vec<_> = self
            .fields
            .iter()
            .filter_map(|spec| check_field(spec, row.value(spec.name)).map(|v| (spec.name, v)))
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(RowViolations {
                schema: self.name,
                violations,
            })
        }
    }
}

/// Split a table into schema-conforming and rejected rows
///
/// Accepted rows pass through unchanged; rejected rows keep their values and
/// gain an `_error` column with the full diagnostic.
pub fn validate_table(table: Table, schema: &RecordSchema) -> Split {
    let columns = table.columns().to_vec();
    let outcomes = table.into_rows().into_iter().map(|row| match schema.check_row(&row) {
        Ok(()) => Ok(row),
        Err(violations) => Err(Rejected::new(row, violations.to_string())),
    });

    let split = Split::collect(&columns, outcomes, VALIDATION_ERROR_COLUMN);
    debug!(
        schema = schema.name,
        valid = split.good.len(),
        invalid = split.bad.len(),
        "Validated table"
    );
    split
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::schema::{inventory_schema, order_schema, product_schema};

    fn valid_order() -> Row {
        Row::new()
            .with("order_id", 1)
            .with("order_date", "2025-10-25")
            .with("product_id", 1001)
            .with("qty", 2)
            .with("unit_price", 10.0)
    }

    #[test]
    fn test_valid_row_passes_unchanged() {
        let row = valid_order().with("extra", "kept");
        let table = Table::from_rows(vec![row.clone()]);

        let split = validate_table(table, &order_schema());
        assert_eq!(split.good.len(), 1);
        assert!(split.bad.is_empty());
        assert_eq!(split.good.rows()[0], row);
    }

    #[test]
    fn test_negative_qty_rejected_with_message() {
        let mut row = valid_order();
        row.set("qty", -1);
        let table = Table::from_rows(vec![row]);

        let split = validate_table(table, &order_schema());
        assert!(split.good.is_empty());
        let bad = &split.bad.rows()[0];
        assert_eq!(bad.value("qty"), &Value::Int(-1));
        assert_eq!(
            bad.value(VALIDATION_ERROR_COLUMN),
            &Value::Str(
                "1 validation error for OrderSchema: qty: ensure this value is greater than or equal to 0"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_all_violations_listed() {
        let row = Row::new()
            .with("order_id", "abc")
            .with("order_date", "2025-10-25")
            .with("qty", 1)
            .with("unit_price", -2.5);

        let err = order_schema().check_row(&row).unwrap_err();
        assert_eq!(err.violations.len(), 3);
        let message = err.to_string();
        assert!(message.starts_with("3 validation errors for OrderSchema: "));
        assert!(message.contains("order_id: value is not a valid integer"));
        assert!(message.contains("product_id: field required"));
        assert!(message.contains("unit_price: ensure this value is greater than or equal to 0"));
    }

    #[test]
    fn test_type_coercion_rules() {
        let schema = order_schema();

        let mut row = valid_order();
        row.set("qty", "3");
        row.set("unit_price", "4.5");
        row.set("product_id", 1001.0);
        assert!(schema.check_row(&row).is_ok());

        row.set("qty", 2.5);
        assert!(schema.check_row(&row).is_err());

        let mut row = valid_order();
        row.set("order_date", "not a date");
        let err = schema.check_row(&row).unwrap_err();
        assert_eq!(
            err.violations,
            vec![(
                "order_date",
                FieldViolation::WrongType {
                    expected: FieldKind::DateTime
                }
            )]
        );
    }

    #[test]
    fn test_optional_fields_may_be_null() {
        let row = valid_order()
            .with("user_id", Value::Null)
            .with("order_status", Value::Null);
        assert!(order_schema().check_row(&row).is_ok());

        let row = valid_order().with("user_id", "nobody");
        assert!(order_schema().check_row(&row).is_err());
    }

    #[test]
    fn test_text_accepts_numbers() {
        let row = Row::new()
            .with("product_id", 7)
            .with("product_name", 12345)
            .with("price", 0);
        assert!(product_schema().check_row(&row).is_ok());
    }

    #[test]
    fn test_upper_bound() {
        let mut schema = inventory_schema();
        schema.fields[2] = FieldSpec::new("stock_on_hand", FieldKind::Integer).with_max(100.0);
        let row = Row::new()
            .with("product_id", 1)
            .with("warehouse_id", "W1")
            .with("stock_on_hand", 101)
            .with("last_restock_date", "2025-10-01");

        let err = schema.check_row(&row).unwrap_err();
        assert_eq!(
            err.to_string(),
            "1 validation error for InventorySchema: stock_on_hand: ensure this value is less than or equal to 100"
        );
    }

    #[test]
    fn test_split_is_complete() {
        let mut bad = valid_order();
        bad.set("unit_price", Value::Null);
        let table = Table::from_rows(vec![valid_order(), bad, valid_order()]);

        let split = validate_table(table, &order_schema());
        assert_eq!(split.len(), 3);
        assert_eq!(split.good.len(), 2);
        assert_eq!(split.bad.len(), 1);
    }
}
