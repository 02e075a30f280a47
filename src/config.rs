//! Configuration management for beeline-runner.
//!
//! Handles loading configuration from TOML files and environment variables.
//! The `[beeline]` table holds the authentication parameters used to launch
//! the remote query tool, `[shell]` names the program that yields the remote
//! shell, and `[runner]` tunes polling, timeouts and the execution log.

use crate::error::{RunnerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for beeline-runner.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote query tool launch parameters.
    #[serde(default)]
    pub beeline: BeelineConfig,

    /// Shell transport settings.
    #[serde(default)]
    pub shell: ShellConfig,

    /// Dispatcher and logger tuning.
    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Parameters for sourcing the environment, authenticating and launching Beeline.
///
/// Every key is optional; absent keys behave as empty strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeelineConfig {
    /// Environment script sourced before authenticating.
    #[serde(default)]
    pub env_path: String,

    /// Keytab used by `kinit -kt`.
    #[serde(default)]
    pub keytab_path: String,

    /// Kerberos principal.
    #[serde(default)]
    pub user: String,

    /// Command that launches the query tool.
    #[serde(default)]
    pub beeline_path: String,

    /// Resource queue used when the caller does not name one.
    #[serde(default, alias = "DEFAULT_QUEUE")]
    pub default_queue: String,

    /// Text that signals the query tool has connected.
    #[serde(default = "default_connect_marker")]
    pub connect_marker: String,
}

fn default_connect_marker() -> String {
    "Connecting to jdbc:".to_string()
}

impl Default for BeelineConfig {
    fn default() -> Self {
        Self {
            env_path: String::new(),
            keytab_path: String::new(),
            user: String::new(),
            beeline_path: String::new(),
            default_queue: String::new(),
            connect_marker: default_connect_marker(),
        }
    }
}

/// Shell transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Program (with arguments) that yields an interactive remote shell,
    /// e.g. `ssh -tt analyst@edge01`.
    #[serde(default)]
    pub command: String,

    /// How long the shell may stay silent after starting before opening
    /// fails. Zero waits indefinitely.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_connect_timeout_secs() -> u64 {
    30
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Polling, timeout and log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Base directory of the execution log.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// How long to wait for the connect marker.
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,

    /// Sleep between empty reads while waiting for the connect marker.
    #[serde(default = "default_session_poll_ms")]
    pub session_poll_ms: u64,

    /// Sleep between empty reads while waiting for query output.
    #[serde(default = "default_query_poll_ms")]
    pub query_poll_ms: u64,

    /// Pause after closing the shell before returning.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Largest chunk requested from the channel per read.
    #[serde(default = "default_read_chunk_bytes")]
    pub read_chunk_bytes: usize,

    /// Ring the terminal bell when a query finishes.
    #[serde(default = "default_bell")]
    pub bell: bool,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("xlogs")
}

fn default_session_timeout_secs() -> u64 {
    10
}

fn default_session_poll_ms() -> u64 {
    100
}

fn default_query_poll_ms() -> u64 {
    1
}

fn default_reconnect_delay_ms() -> u64 {
    500
}

fn default_read_chunk_bytes() -> usize {
    65535
}

fn default_bell() -> bool {
    true
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            session_timeout_secs: default_session_timeout_secs(),
            session_poll_ms: default_session_poll_ms(),
            query_poll_ms: default_query_poll_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            read_chunk_bytes: default_read_chunk_bytes(),
            bell: default_bell(),
        }
    }
}

impl RunnerConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn session_poll(&self) -> Duration {
        Duration::from_millis(self.session_poll_ms)
    }

    pub fn query_poll(&self) -> Duration {
        Duration::from_millis(self.query_poll_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl BeelineConfig {
    /// Applies `BEELINE_*` environment variables to any key left empty.
    pub fn apply_env_defaults(&mut self) {
        fill_from_env(&mut self.env_path, "BEELINE_ENV_PATH");
        fill_from_env(&mut self.keytab_path, "BEELINE_KEYTAB");
        fill_from_env(&mut self.user, "BEELINE_USER");
        fill_from_env(&mut self.beeline_path, "BEELINE_PATH");
        fill_from_env(&mut self.default_queue, "BEELINE_QUEUE");
    }

    /// Resolves the queue for one run: caller value, else the configured
    /// default, else empty.
    pub fn resolve_queue(&self, requested: Option<&str>) -> String {
        match requested {
            Some(queue) => queue.to_string(),
            None => self.default_queue.clone(),
        }
    }
}

impl ShellConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Applies `BEELINE_SHELL` if no command is configured.
    pub fn apply_env_defaults(&mut self) {
        fill_from_env(&mut self.command, "BEELINE_SHELL");
    }
}

fn fill_from_env(field: &mut String, var: &str) {
    if field.is_empty() {
        if let Ok(value) = std::env::var(var) {
            *field = value;
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("beeline-runner")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| RunnerError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            RunnerError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Fills unset values from the environment.
    pub fn apply_env_defaults(&mut self) {
        self.beeline.apply_env_defaults();
        self.shell.apply_env_defaults();
    }
}
