//! Launching Beeline inside a shell session.

use super::MarkerWatch;
use crate::config::{BeelineConfig, RunnerConfig};
use crate::error::Result;
use crate::transport::ShellChannel;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// How session start-up ended.
///
/// Neither variant is an error: a session that never printed the connect
/// marker is still used, and any real failure shows up in the query output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The connect marker was seen.
    Connected,
    /// The timeout passed without the connect marker.
    TimedOut,
}

/// Builds the command that sources the environment, authenticates with the
/// keytab and launches Beeline, optionally on a resource queue.
pub fn launch_command(config: &BeelineConfig, queue: &str) -> String {
    let mut command = format!(
        "source {}; kinit -kt {} {}; {}",
        config.env_path, config.keytab_path, config.user, config.beeline_path
    );
    if !queue.is_empty() {
        command.push(' ');
        command.push_str(queue);
    }
    command.push(';');
    command
}

/// Starts Beeline on an open shell channel and waits for it to connect.
pub struct SessionInitializer<'a> {
    beeline: &'a BeelineConfig,
    timeout: Duration,
    poll: Duration,
    chunk_bytes: usize,
}

impl<'a> SessionInitializer<'a> {
    pub fn new(beeline: &'a BeelineConfig, runner: &RunnerConfig) -> Self {
        Self {
            beeline,
            timeout: runner.session_timeout(),
            poll: runner.session_poll(),
            chunk_bytes: runner.read_chunk_bytes,
        }
    }

    /// Overrides the connect timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sends the launch command and waits for the connect marker.
    ///
    /// Returns [`SessionState::TimedOut`] rather than an error when the
    /// marker does not show up in time. Only transport failures are errors.
    pub async fn start(&self, channel: &mut dyn ShellChannel, queue: &str) -> Result<SessionState> {
        let command = launch_command(self.beeline, queue);
        debug!("Launching beeline: {}", command);
        channel.send_text(&format!("{command}\n")).await?;

        let markers = [self.beeline.connect_marker.as_str()];
        let mut watch = MarkerWatch::new(&markers);
        let mut output = String::new();
        let start = Instant::now();

        loop {
            let elapsed = start.elapsed();
            if elapsed >= self.timeout {
                warn!(
                    "No '{}' after {:?}; continuing without confirmation",
                    self.beeline.connect_marker, self.timeout
                );
                debug!("Session output so far: {}", output);
                return Ok(SessionState::TimedOut);
            }

            let wait = self.poll.max(Duration::from_millis(1)).min(self.timeout - elapsed);
            if let Some(bytes) = channel.read_chunk_timeout(self.chunk_bytes, wait).await? {
                let text = String::from_utf8_lossy(&bytes);
                output.push_str(&text);
                if watch.observe(&text).is_some() {
                    info!("Beeline connected in {:?} (queue: {:?})", start.elapsed(), queue);
                    return Ok(SessionState::Connected);
                }
            }
        }
    }
}
