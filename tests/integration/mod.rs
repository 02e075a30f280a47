//! Integration tests for beeline-runner.

pub mod execution_log_test;
pub mod live_test;
pub mod runner_test;
