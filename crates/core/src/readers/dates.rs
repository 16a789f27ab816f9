//! Date column parsing with a strict format and a permissive fallback

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::{EtlError, EtlResult};
use crate::table::{PARSE_ERROR_COLUMN, Rejected, Split, Table, Value};

/// Reason attached to rows that neither parse attempt could read
pub const FLEXIBLE_PARSE_FAILURE: &str = "Flexible parsing also failed";

/// Default strict format for date columns
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// A recognisable date layout and the chrono formats that read it
struct DateShape {
    pattern: Regex,
    formats: &'static [&'static str],
    with_offset: bool,
}

impl DateShape {
    fn new(pattern: &str, formats: &'static [&'static str], with_offset: bool) -> Self {
        Self {
            pattern: Regex::new(pattern).unwrap(),
            formats,
            with_offset,
        }
    }
}

// Ordered from most to least specific
static FLEXIBLE_SHAPES: Lazy<Vec<DateShape>> = Lazy::new(|| {
    vec![
        DateShape::new(
            r"^\d{4}-\d{1,2}-\d{1,2}[T ]\d{1,2}:\d{2}(:\d{2}(\.\d+)?)?([+-]\d{2}:?\d{2})$",
            &[
                "%Y-%m-%dT%H:%M:%S%.f%z",
                "%Y-%m-%d %H:%M:%S%.f%z",
                "%Y-%m-%dT%H:%M:%S%z",
                "%Y-%m-%d %H:%M:%S%z",
                "%Y-%m-%dT%H:%M%z",
                "%Y-%m-%d %H:%M%z",
            ],
            true,
        ),
        DateShape::new(
            r"^\d{4}-\d{1,2}-\d{1,2}[T ]\d{1,2}:\d{2}(:\d{2}(\.\d+)?)?$",
            &[
                "%Y-%m-%dT%H:%M:%S%.f",
                "%Y-%m-%d %H:%M:%S%.f",
                "%Y-%m-%dT%H:%M:%S",
                "%Y-%m-%d %H:%M:%S",
                "%Y-%m-%dT%H:%M",
                "%Y-%m-%d %H:%M",
            ],
            false,
        ),
        DateShape::new(r"^\d{4}-\d{1,2}-\d{1,2}$", &["%Y-%m-%d"], false),
        DateShape::new(r"^\d{4}/\d{1,2}/\d{1,2}$", &["%Y/%m/%d"], false),
        // Month first, day first only when the month would be out of range
        DateShape::new(r"^\d{1,2}/\d{1,2}/\d{4}$", &["%m/%d/%Y", "%d/%m/%Y"], false),
        DateShape::new(r"^\d{1,2}-\d{1,2}-\d{4}$", &["%m-%d-%Y", "%d-%m-%Y"], false),
        DateShape::new(r"^\d{1,2}\.\d{1,2}\.\d{4}$", &["%d.%m.%Y"], false),
        DateShape::new(r"^\d{8}$", &["%Y%m%d"], false),
        DateShape::new(r"^\d{1,2} [A-Za-z]{3,9} \d{4}$", &["%d %b %Y", "%d %B %Y"], false),
        DateShape::new(
            r"^[A-Za-z]{3,9} \d{1,2},? \d{4}$",
            &["%b %d %Y", "%B %d %Y", "%b %d, %Y", "%B %d, %Y"],
            false,
        ),
    ]
});

/// Parse `raw` with one chrono format
///
/// Date-only formats yield midnight.
pub fn parse_with_format(raw: &str, format: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, format)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse `raw` by inferring its layout
///
/// Values carrying a UTC offset are normalised to naive UTC.
pub fn parse_flexible(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    // chrono's %z does not read a bare "Z"
    let normalized = match raw.strip_suffix(['Z', 'z']) {
        Some(stripped) if stripped.contains(':') => format!("{stripped}+00:00"),
        _ => raw.to_string(),
    };

    let shape = FLEXIBLE_SHAPES
        .iter()
        .find(|shape| shape.pattern.is_match(&normalized))?;

    shape.formats.iter().find_map(|format| {
        if shape.with_offset {
            DateTime::parse_from_str(&normalized, format)
                .ok()
                .map(|dt| dt.naive_utc())
        } else {
            parse_with_format(&normalized, format)
        }
    })
}

/// Text a date parser can read, if the cell holds any
fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Str(s) => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        _ => None,
    }
}

/// Convert one cell, strict first and permissive second
///
/// Returns the parsed value and whether the permissive parser was needed.
pub fn parse_cell(value: &Value, format: Option<&str>) -> Option<(NaiveDateTime, bool)> {
    if let Value::DateTime(dt) = value {
        return Some((*dt, false));
    }
    let text = cell_text(value)?;
    if let Some(dt) = format.and_then(|f| parse_with_format(&text, f)) {
        return Some((dt, false));
    }
    parse_flexible(&text).map(|dt| (dt, true))
}

/// Coerce a cell to a date/time with the permissive parser only
pub fn coerce_datetime(value: &Value) -> Option<NaiveDateTime> {
    parse_cell(value, None).map(|(dt, _)| dt)
}

/// Parse a date column, splitting rows into parsed and parse-failed tables
///
/// Good rows have `column` converted to a date/time. Rows that fail both the
/// strict `format` and the permissive fallback keep their original values
/// and gain a `_parse_error` field. Input order is preserved on both sides.
///
/// # Errors
///
/// Returns [`EtlError::MissingColumn`] if the table has no `column`.
pub fn parse_date_column(table: Table, column: &str, format: Option<&str>) -> EtlResult<Split> {
    if !table.has_column(column) {
        return Err(EtlError::missing_column(column, "date parsing"));
    }

    let columns = table.columns().to_vec();
    let total = table.len();
    let mut recovered = 0usize;

    let outcomes: Vec<_> = table
        .into_rows()
        .into_iter()
        .map(|mut row| match parse_cell(row.value(column), format) {
            Some((dt, fallback)) => {
                if fallback {
                    recovered += 1;
                }
                row.set(column, Value::DateTime(dt));
                Ok(row)
            }
            None => Err(Rejected::new(row, FLEXIBLE_PARSE_FAILURE)),
        })
        .collect();

    let split = Split::collect(&columns, outcomes, PARSE_ERROR_COLUMN);

    debug!(
        column,
        format = format.unwrap_or("<inferred>"),
        total,
        recovered,
        failed = split.bad.len(),
        "Parsed date column"
    );

    Ok(split)
}
