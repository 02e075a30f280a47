//! Command-line argument parsing for beerun.

use beeline_runner::config::Config;
use beeline_runner::error::{Result, RunnerError};
use beeline_runner::query::RunOptions;
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

/// Run a SQL statement through a remote Beeline session.
#[derive(Parser, Debug)]
#[command(name = "beerun")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// SQL statement to run ("-" reads it from stdin)
    #[arg(value_name = "SQL")]
    pub sql: Option<String>,

    /// Read the SQL statement from a file
    #[arg(short = 'f', long, value_name = "PATH", conflicts_with = "sql")]
    pub file: Option<PathBuf>,

    /// Resource queue (defaults to beeline.default_queue)
    #[arg(short = 'q', long, value_name = "QUEUE")]
    pub queue: Option<String>,

    /// Give up after this many seconds; 0 waits indefinitely
    #[arg(short = 't', long, value_name = "SECS", default_value = "0")]
    pub timeout: u64,

    /// Do not print the result
    #[arg(long)]
    pub no_print: bool,

    /// Do not append to the execution log
    #[arg(long)]
    pub no_log: bool,

    /// Execution log directory (overrides runner.log_dir)
    #[arg(long, value_name = "PATH")]
    pub log_dir: Option<PathBuf>,

    /// Command that opens the remote shell (overrides shell.command)
    #[arg(long, value_name = "COMMAND")]
    pub shell: Option<String>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Do not ring the terminal bell when the query ends
    #[arg(long)]
    pub no_bell: bool,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.log_dir {
            config.runner.log_dir = dir.clone();
        }
        if let Some(shell) = &self.shell {
            config.shell.command = shell.clone();
        }
        if self.no_bell {
            config.runner.bell = false;
        }
    }

    /// Builds the per-run options.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            queue: self.queue.clone(),
            print_output: !self.no_print,
            timeout: Duration::from_secs(self.timeout),
            log_enabled: !self.no_log,
        }
    }

    /// Returns the SQL text from the argument, the file, or stdin.
    pub fn read_sql(&self) -> Result<String> {
        if let Some(path) = &self.file {
            return std::fs::read_to_string(path).map_err(|e| {
                RunnerError::config(format!("Failed to read {}: {e}", path.display()))
            });
        }

        match self.sql.as_deref() {
            Some("-") => {
                let mut sql = String::new();
                std::io::stdin()
                    .read_to_string(&mut sql)
                    .map_err(|e| RunnerError::config(format!("Failed to read stdin: {e}")))?;
                Ok(sql)
            }
            Some(sql) => Ok(sql.to_string()),
            None => Err(RunnerError::config(
                "No SQL given. Pass it as an argument, with --file, or '-' for stdin",
            )),
        }
    }
}
