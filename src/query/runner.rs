//! Query execution over a Beeline shell session.
//!
//! Each run opens its own shell, launches Beeline, sends one statement and
//! reads until Beeline prints a row count or an error, or until the timeout.
//! An opened shell is closed on every path, and every run, including one
//! whose shell could not be opened, pauses before returning.

use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::beeline::{
    is_tool_error, parse_transcript, MarkerWatch, ParsedResult, SessionInitializer, SessionState,
    QUERY_MARKERS, STATEMENT_TERMINATOR,
};
use crate::config::Config;
use crate::error::Result;
use crate::notify::{self, Notifier};
use crate::persistence::{ExecutionLogger, LogRecord};
use crate::sql::clean_sql;
use crate::transport::{Connector, ShellChannel};

/// Per-run options.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Resource queue; falls back to the configured default.
    pub queue: Option<String>,
    /// Print the body and status line to stdout when done.
    pub print_output: bool,
    /// Give up after this long. Zero waits indefinitely.
    pub timeout: Duration,
    /// Append the run to the execution log.
    pub log_enabled: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            queue: None,
            print_output: true,
            timeout: Duration::ZERO,
            log_enabled: true,
        }
    }
}

impl RunOptions {
    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn quiet(mut self) -> Self {
        self.print_output = false;
        self
    }

    pub fn without_log(mut self) -> Self {
        self.log_enabled = false;
        self
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Beeline printed a row count.
    Success,
    /// Beeline reported an error.
    ToolError,
    /// The timeout passed before Beeline finished.
    Timeout,
}

impl Completion {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::ToolError => "error",
            Self::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one query run.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// Result table or message text.
    pub body: String,
    /// Row-count line, empty on error or timeout.
    pub status_line: String,
    pub completion: Completion,
    /// Whether Beeline confirmed its connection before the statement was sent.
    pub session: SessionState,
    /// Time from sending the statement to the end of reading.
    pub elapsed: Duration,
    /// Execution log file written, if logging was enabled.
    pub log_path: Option<PathBuf>,
}

impl QueryOutcome {
    /// The `(body, status_line)` pair.
    pub fn into_parts(self) -> (String, String) {
        (self.body, self.status_line)
    }

    pub fn parsed(&self) -> ParsedResult {
        ParsedResult::new(self.body.clone(), self.status_line.clone())
    }
}

/// What the read loop collected.
struct Dispatch {
    transcript: String,
    timed_out: bool,
    session: SessionState,
    elapsed: Duration,
}

/// Runs statements through Beeline, one fresh shell per run.
pub struct QueryRunner {
    config: Config,
    connector: Box<dyn Connector>,
    notifier: Arc<dyn Notifier>,
    logger: ExecutionLogger,
    output: Mutex<Box<dyn Write + Send>>,
}

impl QueryRunner {
    /// Creates a runner; the notifier follows the `bell` setting.
    pub fn new(config: Config, connector: Box<dyn Connector>) -> Self {
        let notifier = notify::from_setting(config.runner.bell);
        let logger = ExecutionLogger::new(config.runner.log_dir.clone());
        Self {
            config,
            connector,
            notifier,
            logger,
            output: Mutex::new(Box::new(std::io::stdout())),
        }
    }

    /// Sends printed results somewhere other than stdout.
    pub fn with_output(mut self, output: impl Write + Send + 'static) -> Self {
        self.output = Mutex::new(Box::new(output));
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn logger(&self) -> &ExecutionLogger {
        &self.logger
    }

    /// Runs one statement.
    ///
    /// Tool errors and timeouts are reported through
    /// [`QueryOutcome::completion`], not as errors. `Err` means the shell
    /// could not be opened or used, or the execution log could not be written.
    pub async fn run_query(&self, sql: &str, options: RunOptions) -> Result<QueryOutcome> {
        let queue = self.config.beeline.resolve_queue(options.queue.as_deref());
        let query = clean_sql(sql);

        let mut channel = match self.connector.open().await {
            Ok(channel) => channel,
            Err(e) => {
                tokio::time::sleep(self.config.runner.reconnect_delay()).await;
                return Err(e);
            }
        };
        let result = self
            .dispatch(channel.as_mut(), &query, &queue, options.timeout)
            .await;
        let result = match result {
            Ok(dispatch) => self.finish(sql, &query, dispatch, &options).await,
            Err(e) => Err(e),
        };

        if let Err(e) = channel.close().await {
            warn!("Failed to close shell: {}", e);
        }
        drop(channel);
        tokio::time::sleep(self.config.runner.reconnect_delay()).await;

        result
    }

    async fn dispatch(
        &self,
        channel: &mut dyn ShellChannel,
        query: &str,
        queue: &str,
        timeout: Duration,
    ) -> Result<Dispatch> {
        let runner = &self.config.runner;
        let chunk_bytes = runner.read_chunk_bytes;

        let session = SessionInitializer::new(&self.config.beeline, runner)
            .start(channel, queue)
            .await?;

        let stale = channel.drain(chunk_bytes).await?;
        if stale > 0 {
            debug!("Discarded {} bytes of session output", stale);
        }

        channel
            .send_text(&format!("{query}{STATEMENT_TERMINATOR}"))
            .await?;

        let poll = runner.query_poll().max(Duration::from_millis(1));
        let mut watch = MarkerWatch::new(&QUERY_MARKERS);
        let mut transcript = String::new();
        let start = Instant::now();

        let timed_out = loop {
            let wait = if timeout.is_zero() {
                poll
            } else {
                let elapsed = start.elapsed();
                if elapsed >= timeout {
                    warn!("Query timed out after {:?}", timeout);
                    self.notifier.notify();
                    break true;
                }
                poll.min(timeout - elapsed)
            };

            if let Some(bytes) = channel.read_chunk_timeout(chunk_bytes, wait).await? {
                let text = String::from_utf8_lossy(&bytes);
                debug!("Received {} bytes", bytes.len());
                transcript.push_str(&text);
                if let Some(marker) = watch.observe(&text) {
                    debug!("Saw terminal marker {:?}", marker);
                    self.notifier.notify();
                    break false;
                }
            }
        };

        Ok(Dispatch {
            transcript,
            timed_out,
            session,
            elapsed: start.elapsed(),
        })
    }

    async fn finish(
        &self,
        original: &str,
        query: &str,
        dispatch: Dispatch,
        options: &RunOptions,
    ) -> Result<QueryOutcome> {
        let parsed = parse_transcript(&dispatch.transcript, query);
        let completion = if dispatch.timed_out {
            Completion::Timeout
        } else if is_tool_error(&dispatch.transcript) {
            Completion::ToolError
        } else {
            Completion::Success
        };
        match parsed.row_count() {
            Some(rows) => info!(
                "Query finished: {} in {:?} ({} rows)",
                completion, dispatch.elapsed, rows
            ),
            None => info!("Query finished: {} in {:?}", completion, dispatch.elapsed),
        }

        let log_path = if options.log_enabled {
            let record = LogRecord::now(original.trim(), &parsed);
            Some(self.logger.append(&record).await?)
        } else {
            None
        };

        if completion == Completion::ToolError {
            if let Some(path) = &log_path {
                warn!("Query failed, see {}", path.display());
            }
        }

        if options.print_output {
            let mut out = self
                .output
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Err(e) = write_result(&mut **out, &parsed) {
                warn!("Failed to print query result: {}", e);
            }
        }

        Ok(QueryOutcome {
            body: parsed.body,
            status_line: parsed.status_line,
            completion,
            session: dispatch.session,
            elapsed: dispatch.elapsed,
            log_path,
        })
    }
}

/// Writes the body, then the status line when there is one.
fn write_result(out: &mut dyn Write, parsed: &ParsedResult) -> std::io::Result<()> {
    writeln!(out, "{}", parsed.body)?;
    if !parsed.status_line.is_empty() {
        writeln!(out, "{}", parsed.status_line)?;
    }
    out.flush()
}
