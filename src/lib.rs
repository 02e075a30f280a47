//! beeline-runner - run SQL through a remote Beeline session.
//!
//! This library exposes the core modules for use by the binary and in
//! integration tests.

pub mod beeline;
pub mod calendar;
pub mod config;
pub mod error;
pub mod logging;
pub mod notify;
pub mod persistence;
pub mod query;
pub mod sql;
pub mod transport;
