//! Untyped rows and tables
//!
//! Input files are loaded into loosely typed [`Table`]s: every cell is a
//! [`Value`] and every row maps column names to values in column order.
//! Stages that can reject rows produce a [`Split`], built from one
//! `Result<Row, Rejected>` per input row.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Column added to rows that failed date parsing
pub const PARSE_ERROR_COLUMN: &str = "_parse_error";

/// Column added to rows that failed schema validation
pub const VALIDATION_ERROR_COLUMN: &str = "_error";

/// Display format for date/time cells in delimited output
pub const DATETIME_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 2^63: floats in `[-2^63, 2^63)` convert to `i64` exactly
const I64_FLOAT_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing or empty cell
    Null,
    /// Integer literal
    Int(i64),
    /// Floating point literal
    Float(f64),
    /// Anything else
    Str(String),
    /// Parsed date/time
    DateTime(NaiveDateTime),
}

impl Value {
    /// Type a raw delimited-text cell
    ///
    /// Empty cells are `Null`; integer and float literals become numbers;
    /// everything else is kept as a string.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Int(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_nan() {
                return Value::Null;
            }
            return Value::Float(f);
        }
        Value::Str(raw.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value, parsing strings when possible
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) if f.is_finite() => Some(*f),
            Value::Str(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    /// Integer view of the value; floats must be integral and within range
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f)
                if f.fract() == 0.0 && (-I64_FLOAT_BOUND..I64_FLOAT_BOUND).contains(f) =>
            {
                Some(*f as i64)
            }
            Value::Str(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| Value::Float(s.parse::<f64>().ok()?).as_i64())
            }
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Text view used for delimited output; `None` for nulls
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Short type name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::DateTime(_) => "datetime",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(i) => write!(f, "{i}"),
            // Debug keeps the trailing ".0" on integral floats
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_DISPLAY_FORMAT)),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// One record: column name to value, in column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    /// Value of a column, treating absent columns as null
    pub fn value(&self, column: &str) -> &Value {
        self.get(column).unwrap_or(&Value::Null)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.iter().any(|(name, _)| name == column)
    }

    /// Replace the value of an existing column or append a new one
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column, value)),
        }
    }

    /// Rename a column in place, keeping its position
    pub fn rename(&mut self, from: &str, to: &str) {
        if from == to || self.contains(to) {
            return;
        }
        if let Some((name, _)) = self.fields.iter_mut().find(|(name, _)| name == from) {
            *name = to.to_string();
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, v)| (name.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Ordered rows plus the ordered union of their columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty table with a known header
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn from_rows(rows: impl IntoIterator<Item = Row>) -> Self {
        let mut table = Self::new();
        for row in rows {
            table.push(row);
        }
        table
    }

    /// Append a row, extending the column list with any unseen columns
    pub fn push(&mut self, row: Row) {
        for column in row.columns() {
            if !self.has_column(column) {
                self.columns.push(column.to_string());
            }
        }
        self.rows.push(row);
    }

    /// Append every row of another table
    pub fn extend(&mut self, other: Table) {
        for column in other.columns {
            if !self.has_column(&column) {
                self.columns.push(column);
            }
        }
        self.rows.extend(other.rows);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Rename a column in the header and in every row
    pub fn rename_column(&mut self, from: &str, to: &str) {
        if from == to || self.has_column(to) {
            return;
        }
        if let Some(name) = self.columns.iter_mut().find(|c| *c == from) {
            *name = to.to_string();
        }
        for row in &mut self.rows {
            row.rename(from, to);
        }
    }

    /// Register a column that rows will be given
    pub fn ensure_column(&mut self, column: &str) {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, null where a row lacks it
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows.iter().map(move |row| row.value(column))
    }
}

/// A row set aside together with the reason it was rejected
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub row: Row,
    pub reason: String,
}

impl Rejected {
    pub fn new(row: Row, reason: impl Into<String>) -> Self {
        Self {
            row,
            reason: reason.into(),
        }
    }
}

/// Good/bad pair produced by a stage that can reject rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Split {
    pub good: Table,
    pub bad: Table,
}

impl Split {
    /// Collect per-row outcomes, tagging rejected rows with `error_column`
    ///
    /// Both tables keep the header of `source`, so an empty side still
    /// knows its columns.
    pub fn collect<I>(source_columns: &[String], outcomes: I, error_column: &str) -> Self
    where
        I: IntoIterator<Item = Result<Row, Rejected>>,
    {
        let mut good = Table::with_columns(source_columns.iter().cloned());
        let mut bad = Table::with_columns(source_columns.iter().cloned());
        bad.ensure_column(error_column);

        for outcome in outcomes {
            match outcome {
                Ok(row) => good.push(row),
                Err(Rejected { mut row, reason }) => {
                    row.set(error_column, reason);
                    bad.push(row);
                }
            }
        }

        Self { good, bad }
    }

    /// Total number of rows across both sides
    pub fn len(&self) -> usize {
        self.good.len() + self.bad.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
