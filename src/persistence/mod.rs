//! Persistence layer for beeline-runner.
//!
//! The only durable state is the plain-text execution log, one file per day.

mod execution_log;

pub use execution_log::{ExecutionLogger, LogRecord};
