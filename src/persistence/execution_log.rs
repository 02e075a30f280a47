//! Append-only execution log.
//!
//! Every query run appends one block to a per-day text file under
//! `<base>/<YYYY>/<MM>/logs_<YYYY_MM_DD>.txt`:
//!
//! ```text
//!
//!
//! ----------------------------------------------------------------------
//! 2024-03-11 14:05:09
//! ----------------------------------------------------------------------
//!
//! select count(*) from sales
//!
//! +-----------+
//! |    _c0    |
//! +-----------+
//! | 48213     |
//! +-----------+
//! 1 row selected (3.2 seconds)
//! ```

use crate::beeline::ParsedResult;
use crate::calendar::DateContext;
use crate::error::{Result, RunnerError};
use chrono::{Local, NaiveDateTime};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

const SEPARATOR_WIDTH: usize = 70;

/// One query run as written to the execution log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: NaiveDateTime,
    pub query: String,
    pub body: String,
    pub status_line: String,
}

impl LogRecord {
    pub fn new(query: impl Into<String>, result: &ParsedResult, timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            query: query.into(),
            body: result.body.clone(),
            status_line: result.status_line.clone(),
        }
    }

    /// Record stamped with the current local time.
    pub fn now(query: impl Into<String>, result: &ParsedResult) -> Self {
        Self::new(query, result, Local::now().naive_local())
    }

    /// Renders the block appended to the log file.
    pub fn render(&self) -> String {
        let separator = "-".repeat(SEPARATOR_WIDTH);
        let mut block = format!(
            "\n\n{separator}\n{}\n{separator}\n\n{}\n\n{}\n",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.query,
            self.body
        );
        if !self.status_line.is_empty() {
            block.push_str(&self.status_line);
            block.push('\n');
        }
        block
    }
}

/// Writes [`LogRecord`]s into the dated directory tree under a base directory.
#[derive(Debug, Clone)]
pub struct ExecutionLogger {
    base_dir: PathBuf,
}

impl ExecutionLogger {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Log file for the given day.
    pub fn log_path(&self, day: &DateContext) -> PathBuf {
        self.base_dir
            .join(day.year_dir())
            .join(day.month_dir())
            .join(day.log_file_name())
    }

    /// Appends `record` to the file for its own date, creating directories
    /// as needed. Returns the file written.
    pub async fn append(&self, record: &LogRecord) -> Result<PathBuf> {
        let day = DateContext::for_date(record.timestamp.date());
        let path = self.log_path(&day);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                RunnerError::log(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| RunnerError::log(format!("failed to open {}: {e}", path.display())))?;

        file.write_all(record.render().as_bytes())
            .await
            .map_err(|e| RunnerError::log(format!("failed to write {}: {e}", path.display())))?;
        file.flush()
            .await
            .map_err(|e| RunnerError::log(format!("failed to flush {}: {e}", path.display())))?;

        debug!("Appended execution log record to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    fn record(query: &str, body: &str, status: &str, timestamp: NaiveDateTime) -> LogRecord {
        LogRecord::new(query, &ParsedResult::new(body, status), timestamp)
    }

    #[test]
    fn test_render_block_layout() {
        let rec = record(
            "select 1",
            "+------+\n| _c0  |\n+------+\n| 1    |\n+------+",
            "1 row selected",
            at(2024, 3, 11, 14, 5, 9),
        );
        let dashes = "-".repeat(70);
        let expected = format!(
            "\n\n{dashes}\n2024-03-11 14:05:09\n{dashes}\n\nselect 1\n\n\
             +------+\n| _c0  |\n+------+\n| 1    |\n+------+\n1 row selected\n"
        );
        assert_eq!(rec.render(), expected);
    }

    #[test]
    fn test_render_without_status_line() {
        let rec = record("select x", "Error: bad column x", "", at(2024, 1, 2, 3, 4, 5));
        assert!(rec.render().ends_with("\n\nselect x\n\nError: bad column x\n"));
    }

    #[test]
    fn test_log_path_layout() {
        let logger = ExecutionLogger::new("/var/log/beerun");
        let day = DateContext::for_date(NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
        assert_eq!(
            logger.log_path(&day),
            PathBuf::from("/var/log/beerun/2024/03/logs_2024_03_11.txt")
        );
    }

    #[tokio::test]
    async fn test_append_creates_directories() {
        let dir = tempdir().unwrap();
        let logger = ExecutionLogger::new(dir.path().join("xlogs"));
        let rec = record("select 1", "1", "", at(2024, 3, 11, 9, 0, 0));

        let path = logger.append(&rec).await.unwrap();

        assert_eq!(
            path,
            dir.path().join("xlogs/2024/03/logs_2024_03_11.txt")
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), rec.render());
    }

    #[tokio::test]
    async fn test_append_is_append_only() {
        let dir = tempdir().unwrap();
        let logger = ExecutionLogger::new(dir.path());
        let first = record("select 1", "a", "1 row selected", at(2024, 3, 11, 9, 0, 0));
        let second = record("select 2", "b", "1 row selected", at(2024, 3, 11, 9, 5, 0));

        let path = logger.append(&first).await.unwrap();
        let len_after_first = std::fs::metadata(&path).unwrap().len();
        let same_path = logger.append(&second).await.unwrap();
        let len_after_second = std::fs::metadata(&path).unwrap().len();

        assert_eq!(path, same_path);
        assert!(len_after_second > len_after_first);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            format!("{}{}", first.render(), second.render())
        );
    }

    #[tokio::test]
    async fn test_records_on_different_days_use_different_files() {
        let dir = tempdir().unwrap();
        let logger = ExecutionLogger::new(dir.path());

        let march = logger
            .append(&record("q", "b", "", at(2024, 3, 31, 23, 59, 59)))
            .await
            .unwrap();
        let april = logger
            .append(&record("q", "b", "", at(2024, 4, 1, 0, 0, 0)))
            .await
            .unwrap();

        assert!(march.ends_with("2024/03/logs_2024_03_31.txt"));
        assert!(april.ends_with("2024/04/logs_2024_04_01.txt"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_append_fails_when_base_is_a_file() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("xlogs");
        std::fs::write(&blocker, "not a directory").unwrap();

        let logger = ExecutionLogger::new(&blocker);
        let result = logger
            .append(&record("q", "b", "", at(2024, 3, 11, 9, 0, 0)))
            .await;

        assert!(matches!(result, Err(RunnerError::Log(_))));
    }
}
