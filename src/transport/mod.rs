//! Shell transport abstraction for beeline-runner.
//!
//! Provides a trait-based interface over a bidirectional shell channel so the
//! session and dispatch logic can run against a real remote shell or a
//! scripted double interchangeably.

mod mock;
mod process;

pub use mock::{FailingConnector, MockChunk, MockConnector, MockShellChannel, MockShellState};
pub use process::{ProcessChannel, ProcessConnector};

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Interval used by the provided polling implementation of
/// [`ShellChannel::read_chunk_timeout`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// A live, bidirectional text stream to a remote command interpreter.
///
/// Implementations must hand out chunks that decode cleanly on their own,
/// i.e. never split a multi-byte UTF-8 sequence across two reads while more
/// bytes of it are still expected.
#[async_trait]
pub trait ShellChannel: Send {
    /// Writes text to the remote shell's input.
    async fn send_text(&mut self, text: &str) -> Result<()>;

    /// Returns true if a read would return data without waiting.
    fn has_data_available(&mut self) -> Result<bool>;

    /// Reads at most `max_bytes` of pending output.
    async fn read_chunk(&mut self, max_bytes: usize) -> Result<Vec<u8>>;

    /// Closes the channel and releases the remote shell.
    async fn close(&mut self) -> Result<()>;

    /// Waits up to `wait` for output and reads one chunk of it.
    ///
    /// Returns `Ok(None)` if nothing arrived in time. The provided version
    /// polls [`has_data_available`](Self::has_data_available); channels that
    /// can block on their source should override it.
    async fn read_chunk_timeout(
        &mut self,
        max_bytes: usize,
        wait: Duration,
    ) -> Result<Option<Vec<u8>>> {
        let deadline = Instant::now() + wait;
        loop {
            if self.has_data_available()? {
                return self.read_chunk(max_bytes).await.map(Some);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(DEFAULT_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Discards everything currently buffered, returning the byte count.
    async fn drain(&mut self, max_bytes: usize) -> Result<usize> {
        let mut discarded = 0;
        while self.has_data_available()? {
            discarded += self.read_chunk(max_bytes).await?.len();
        }
        Ok(discarded)
    }
}

/// Opens a fresh shell channel for each query run.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a new channel. Channels are never pooled or reused.
    async fn open(&self) -> Result<Box<dyn ShellChannel>>;
}
