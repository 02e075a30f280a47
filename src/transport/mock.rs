//! Scripted shell channel for testing.
//!
//! A [`MockShellChannel`] replays canned output: each `send_text` call
//! releases the next scripted batch of chunks, optionally delayed, so the
//! session and dispatch logic can be exercised without a remote host.

use super::{Connector, ShellChannel};
use crate::error::{Result, RunnerError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// One piece of scripted output.
#[derive(Debug, Clone)]
pub struct MockChunk {
    /// Delay after the triggering send before the chunk becomes readable.
    pub delay: Duration,
    pub bytes: Vec<u8>,
}

impl MockChunk {
    /// A chunk that is readable as soon as it is released.
    pub fn now(text: impl Into<String>) -> Self {
        Self::after(Duration::ZERO, text)
    }

    /// A chunk that becomes readable `delay` after it is released.
    pub fn after(delay: Duration, text: impl Into<String>) -> Self {
        Self {
            delay,
            bytes: text.into().into_bytes(),
        }
    }
}

/// What happened on a mock channel, shared so tests can inspect it after the
/// channel has been handed to the runner.
#[derive(Debug, Default)]
pub struct MockShellState {
    /// Every text passed to `send_text`, in order.
    pub sent: Vec<String>,
    /// Whether `close` was called.
    pub closed: bool,
    /// Total bytes handed out by `read_chunk`.
    pub bytes_read: usize,
}

/// A shell channel that replays scripted output.
pub struct MockShellChannel {
    script: VecDeque<Vec<MockChunk>>,
    released: VecDeque<(Instant, Vec<u8>)>,
    fail_sends: bool,
    state: Arc<Mutex<MockShellState>>,
}

impl MockShellChannel {
    /// Creates a channel with no scripted output.
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            released: VecDeque::new(),
            fail_sends: false,
            state: Arc::new(Mutex::new(MockShellState::default())),
        }
    }

    /// Output already buffered when the channel opens (login banner, prompt).
    pub fn with_banner(mut self, text: impl Into<String>) -> Self {
        let now = Instant::now();
        self.released.push_back((now, text.into().into_bytes()));
        self
    }

    /// Output released by the next unscripted `send_text` call.
    pub fn on_send(mut self, chunks: Vec<MockChunk>) -> Self {
        self.script.push_back(chunks);
        self
    }

    /// Convenience for [`on_send`](Self::on_send) with immediate text chunks.
    pub fn on_send_text(self, chunks: &[&str]) -> Self {
        self.on_send(chunks.iter().map(|c| MockChunk::now(*c)).collect())
    }

    /// Makes every `send_text` call fail with a transport error.
    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    /// Returns a handle to the channel's recorded state.
    pub fn state(&self) -> Arc<Mutex<MockShellState>> {
        Arc::clone(&self.state)
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MockShellState) -> T) -> T {
        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    fn front_ready(&self) -> bool {
        self.released
            .front()
            .is_some_and(|(ready_at, _)| *ready_at <= Instant::now())
    }
}

impl Default for MockShellChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ShellChannel for MockShellChannel {
    async fn send_text(&mut self, text: &str) -> Result<()> {
        if self.fail_sends {
            return Err(RunnerError::transport("mock send failure"));
        }
        if self.with_state(|s| s.closed) {
            return Err(RunnerError::transport("mock channel is closed"));
        }
        self.with_state(|s| s.sent.push(text.to_string()));

        if let Some(chunks) = self.script.pop_front() {
            let released_at = Instant::now();
            for chunk in chunks {
                self.released
                    .push_back((released_at + chunk.delay, chunk.bytes));
            }
        }
        Ok(())
    }

    fn has_data_available(&mut self) -> Result<bool> {
        Ok(self.front_ready())
    }

    async fn read_chunk(&mut self, max_bytes: usize) -> Result<Vec<u8>> {
        let ready_at = match self.released.front() {
            Some((ready_at, _)) => *ready_at,
            None => return Err(RunnerError::transport("mock channel has no more output")),
        };
        tokio::time::sleep_until(ready_at).await;

        let (ready_at, mut bytes) = self
            .released
            .pop_front()
            .ok_or_else(|| RunnerError::internal("mock chunk vanished"))?;
        if bytes.len() > max_bytes {
            let rest = bytes.split_off(max_bytes);
            self.released.push_front((ready_at, rest));
        }
        let len = bytes.len();
        self.with_state(|s| s.bytes_read += len);
        Ok(bytes)
    }

    async fn close(&mut self) -> Result<()> {
        self.with_state(|s| s.closed = true);
        Ok(())
    }
}

/// Hands out pre-built mock channels, one per `open` call.
pub struct MockConnector {
    channels: Mutex<VecDeque<MockShellChannel>>,
}

impl MockConnector {
    pub fn new(channels: Vec<MockShellChannel>) -> Self {
        Self {
            channels: Mutex::new(channels.into()),
        }
    }

    /// Number of channels not yet opened.
    pub fn remaining(&self) -> usize {
        self.channels
            .lock()
            .map(|c| c.len())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self) -> Result<Box<dyn ShellChannel>> {
        let next = self
            .channels
            .lock()
            .map_err(|_| RunnerError::internal("mock connector lock poisoned"))?
            .pop_front();
        match next {
            Some(channel) => Ok(Box::new(channel)),
            None => Err(RunnerError::connection("no scripted channel left")),
        }
    }
}

/// A connector whose `open` always fails.
pub struct FailingConnector {
    message: String,
}

impl FailingConnector {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for FailingConnector {
    fn default() -> Self {
        Self::new("connection refused")
    }
}

#[async_trait]
impl Connector for FailingConnector {
    async fn open(&self) -> Result<Box<dyn ShellChannel>> {
        Err(RunnerError::connection(self.message.clone()))
    }
}
