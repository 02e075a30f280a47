//! Query execution for beeline-runner.
//!
//! This module isolates the per-run shell lifecycle, the read loop and result
//! reporting from the command-line front end.

pub mod runner;

pub use runner::{Completion, QueryOutcome, QueryRunner, RunOptions};
