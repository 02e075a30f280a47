//! Date context for partition indices and dated log paths.
//!
//! Values are derived from an explicit date taken when the caller needs it,
//! so a long-running process never works with a stale "today". The partition
//! indices are for callers that address day- or month-partitioned tables;
//! the runner itself only uses the log path parts.

use chrono::{Datelike, Local, NaiveDate};

/// A calendar date plus the derived values the runner needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateContext {
    date: NaiveDate,
}

impl DateContext {
    /// Context for the current local date.
    pub fn today() -> Self {
        Self::for_date(Local::now().date_naive())
    }

    pub fn for_date(date: NaiveDate) -> Self {
        Self { date }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Days since 1970-01-01 (day partition index).
    pub fn day_index(&self) -> i64 {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
        (self.date - epoch).num_days()
    }

    /// Months since January 1970 (month partition index).
    pub fn month_index(&self) -> i64 {
        (i64::from(self.date.year()) - 1970) * 12 + i64::from(self.date.month0())
    }

    /// Four-digit year directory name, e.g. `2024`.
    pub fn year_dir(&self) -> String {
        self.date.format("%Y").to_string()
    }

    /// Two-digit month directory name, e.g. `03`.
    pub fn month_dir(&self) -> String {
        self.date.format("%m").to_string()
    }

    /// Execution log file name, e.g. `logs_2024_03_11.txt`.
    pub fn log_file_name(&self) -> String {
        self.date.format("logs_%Y_%m_%d.txt").to_string()
    }
}
