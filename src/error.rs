//! Error types for beeline-runner.
//!
//! Tool-reported query errors and timeouts are not errors at this level; they
//! come back as a [`Completion`](crate::query::Completion) tag. This enum
//! covers the failures the caller cannot recover from by reading the output.

use thiserror::Error;

/// Main error type for beeline-runner operations.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Opening the remote shell failed (spawn failure, host unreachable, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Sending to or reading from an open shell channel failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Creating the log directory or appending to the log file failed.
    #[error("Log error: {0}")]
    Log(String),

    /// Configuration errors (invalid config file, empty shell command, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RunnerError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a transport error with the given message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Creates a log error with the given message.
    pub fn log(msg: impl Into<String>) -> Self {
        Self::Log(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Transport(_) => "Transport Error",
            Self::Log(_) => "Log Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using RunnerError.
pub type Result<T> = std::result::Result<T, RunnerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_connection() {
        let err = RunnerError::connection("failed to spawn `ssh -tt edge01`");
        assert_eq!(
            err.to_string(),
            "Connection error: failed to spawn `ssh -tt edge01`"
        );
        assert_eq!(err.category(), "Connection Error");
    }

    #[test]
    fn test_error_display_transport() {
        let err = RunnerError::transport("broken pipe");
        assert_eq!(err.to_string(), "Transport error: broken pipe");
        assert_eq!(err.category(), "Transport Error");
    }

    #[test]
    fn test_error_display_log() {
        let err = RunnerError::log("permission denied: xlogs/2024/03");
        assert_eq!(
            err.to_string(),
            "Log error: permission denied: xlogs/2024/03"
        );
        assert_eq!(err.category(), "Log Error");
    }

    #[test]
    fn test_error_display_config() {
        let err = RunnerError::config("shell command is empty");
        assert_eq!(
            err.to_string(),
            "Configuration error: shell command is empty"
        );
        assert_eq!(err.category(), "Configuration Error");
    }

    #[test]
    fn test_error_display_internal() {
        let err = RunnerError::internal("unexpected state");
        assert_eq!(err.to_string(), "Internal error: unexpected state");
        assert_eq!(err.category(), "Internal Error");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RunnerError>();
    }
}
