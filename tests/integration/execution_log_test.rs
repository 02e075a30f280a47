//! Execution log integration tests.

use beeline_runner::beeline::ParsedResult;
use beeline_runner::calendar::DateContext;
use beeline_runner::persistence::{ExecutionLogger, LogRecord};
use chrono::NaiveDate;
use tempfile::tempdir;

fn at(day: u32, hour: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

#[tokio::test]
async fn test_log_length_never_decreases() {
    let dir = tempdir().unwrap();
    let logger = ExecutionLogger::new(dir.path());
    let result = ParsedResult::new("+---+\n| 1 |\n+---+", "1 row selected");

    let mut last_len = 0;
    for hour in 8..12 {
        let path = logger
            .append(&LogRecord::new("select 1", &result, at(11, hour)))
            .await
            .unwrap();
        let len = std::fs::metadata(&path).unwrap().len();
        assert!(len > last_len);
        last_len = len;
    }
}

#[tokio::test]
async fn test_existing_directories_are_reused() {
    let dir = tempdir().unwrap();
    let logger = ExecutionLogger::new(dir.path());
    let day = DateContext::for_date(NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
    let expected = logger.log_path(&day);
    std::fs::create_dir_all(expected.parent().unwrap()).unwrap();
    std::fs::write(&expected, "earlier content\n").unwrap();

    let path = logger
        .append(&LogRecord::new(
            "select 2",
            &ParsedResult::new("2", ""),
            at(11, 10),
        ))
        .await
        .unwrap();

    assert_eq!(path, expected);
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("earlier content\n\n\n"));
    assert!(content.ends_with("select 2\n\n2\n"));
}
