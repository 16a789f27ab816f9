//! Processing dates, date ranges and the retrying range driver

use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use tracing::{error, info, warn};

use super::executor::PipelineExecutor;
use super::summary::DateOutcome;
use crate::error::{EtlError, EtlResult};

/// Compact processing date format
pub const COMPACT_DATE_FORMAT: &str = "%Y%m%d";

fn parse_processing_date(input: &str) -> EtlResult<NaiveDate> {
    let trimmed = input.trim();
    let compact = trimmed.replace('-', "");
    let well_formed = match trimmed.len() {
        8 => trimmed.bytes().all(|b| b.is_ascii_digit()),
        10 => {
            let bytes = trimmed.as_bytes();
            bytes[4] == b'-' && bytes[7] == b'-' && compact.bytes().all(|b| b.is_ascii_digit())
        }
        _ => false,
    };
    if !well_formed || compact.len() != 8 {
        return Err(EtlError::InvalidDate(input.to_string()));
    }
    NaiveDate::parse_from_str(&compact, COMPACT_DATE_FORMAT)
        .map_err(|_| EtlError::InvalidDate(input.to_string()))
}

/// Normalise `YYYYMMDD` or `YYYY-MM-DD` to `YYYYMMDD`
pub fn normalize_date(input: &str) -> EtlResult<String> {
    parse_processing_date(input).map(|d| d.format(COMPACT_DATE_FORMAT).to_string())
}

/// `YYYYMMDD` to `YYYY-MM-DD`
pub fn iso_date(date: &str) -> EtlResult<String> {
    parse_processing_date(date).map(|d| d.format("%Y-%m-%d").to_string())
}

/// An inclusive range of processing dates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Range from `start` to `end` (or just `start`)
    pub fn new(start: &str, end: Option<&str>) -> EtlResult<Self> {
        let start_date = parse_processing_date(start)?;
        let end_date = match end {
            Some(end) => parse_processing_date(end)?,
            None => start_date,
        };
        if end_date < start_date {
            return Err(EtlError::InvalidDate(format!(
                "end date {} is before start date {}",
                end.unwrap_or_default(),
                start
            )));
        }
        Ok(Self {
            start: start_date,
            end: end_date,
        })
    }

    /// Every date in the range, `YYYYMMDD`, in order
    pub fn dates(&self) -> Vec<String> {
        let mut dates = Vec::new();
        let mut day = self.start;
        while day <= self.end {
            dates.push(day.format(COMPACT_DATE_FORMAT).to_string());
            match day.checked_add_days(Days::new(1)) {
                Some(next) => day = next,
                None => break,
            }
        }
        dates
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

/// Fixed-delay retry for failing dates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first
    pub retries: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl RetryPolicy {
    /// Scheduler's fixed pause between attempts
    pub const DEFAULT_DELAY_SECS: u64 = 300;

    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// No retries
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Run `op` until it succeeds or the attempts are used up
    ///
    /// `op` receives the 1-based attempt number. Only recoverable errors
    /// (see [`EtlError::is_recoverable`]) are retried; the last error is
    /// returned.
    pub fn run<T, F>(&self, mut op: F) -> EtlResult<T>
    where
        F: FnMut(u32) -> EtlResult<T>,
    {
        let attempts = self.retries.saturating_add(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts && e.is_recoverable() => {
                    warn!(
                        attempt,
                        attempts,
                        error = %e,
                        delay_secs = self.delay.as_secs(),
                        "Attempt failed, retrying"
                    );
                    if !self.delay.is_zero() {
                        thread::sleep(self.delay);
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(0, Duration::from_secs(Self::DEFAULT_DELAY_SECS))
    }
}

/// Run every date of `range`, never stopping at a failed date
pub fn run_date_range(
    executor: &PipelineExecutor,
    range: &DateRange,
    retry: &RetryPolicy,
) -> BTreeMap<String, DateOutcome> {
    let mut results = BTreeMap::new();
    for date in range.dates() {
        let outcome = match retry.run(|_| executor.run_for_date(&date)) {
            Ok(summary) => {
                info!(date = %date, rows = summary.rows, revenue = summary.revenue, "Date completed");
                DateOutcome::Completed(summary)
            }
            Err(e) => {
                error!(date = %date, error = %e, "Date failed");
                DateOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };
        results.insert(date, outcome);
    }
    results
}
