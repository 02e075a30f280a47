//! Shell channel backed by a local child process.
//!
//! The configured command is expected to yield an interactive remote shell
//! (typically `ssh -tt user@host`). Its stdout and stderr are merged into a
//! single output stream, the way a remote pty would present them.

use super::{Connector, ShellChannel};
use crate::config::ShellConfig;
use crate::error::{Result, RunnerError};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::debug;

const PUMP_BUFFER_BYTES: usize = 8192;

/// Opens a [`ProcessChannel`] per run from a configured shell command.
pub struct ProcessConnector {
    command: String,
    connect_timeout: Duration,
}

impl ProcessConnector {
    /// Connector with no bound on how long the shell takes to start talking.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            connect_timeout: Duration::ZERO,
        }
    }

    /// Fails `open` if the shell prints nothing within `timeout`. Zero disables
    /// the check.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn from_config(config: &ShellConfig) -> Self {
        Self::new(config.command.clone()).with_connect_timeout(config.connect_timeout())
    }
}

#[async_trait]
impl Connector for ProcessConnector {
    async fn open(&self) -> Result<Box<dyn ShellChannel>> {
        let mut channel = ProcessChannel::spawn(&self.command)?;
        if !self.connect_timeout.is_zero() {
            channel.await_first_output(self.connect_timeout).await?;
        }
        Ok(Box::new(channel))
    }
}

/// A running shell process with piped input and merged output.
pub struct ProcessChannel {
    child: Child,
    stdin: Option<ChildStdin>,
    output: UnboundedReceiver<Vec<u8>>,
    pending: Vec<u8>,
    ended: bool,
    closed: bool,
}

impl ProcessChannel {
    /// Spawns `command` (split on whitespace) and starts pumping its output.
    pub fn spawn(command: &str) -> Result<Self> {
        let parts: Vec<&str> = command.split_whitespace().collect();
        if parts.is_empty() {
            return Err(RunnerError::config("shell command is empty"));
        }

        let mut child = Command::new(parts[0])
            .args(&parts[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RunnerError::connection(format!("failed to spawn `{command}`: {e}")))?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::internal("child stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RunnerError::internal("child stderr was not captured"))?;

        let (tx, rx) = mpsc::unbounded_channel();
        pump(stdout, tx.clone(), "stdout");
        pump(stderr, tx, "stderr");

        debug!("Spawned shell process: {}", command);
        Ok(Self {
            child,
            stdin,
            output: rx,
            pending: Vec::new(),
            ended: false,
            closed: false,
        })
    }

    /// Waits until the process has written something, or its output ended.
    async fn await_first_output(&mut self, wait: Duration) -> Result<()> {
        while self.pending.is_empty() {
            if self.ended {
                return Err(RunnerError::connection(
                    "shell exited before producing output",
                ));
            }
            tokio::time::timeout(wait, self.receive())
                .await
                .map_err(|_| {
                    RunnerError::connection(format!("no shell output within {wait:?}"))
                })?;
        }
        Ok(())
    }

    /// Waits for the next pumped chunk.
    async fn receive(&mut self) {
        match self.output.recv().await {
            Some(chunk) => self.pending.extend(chunk),
            None => self.ended = true,
        }
    }

    /// Moves already-pumped chunks into `pending` without waiting.
    fn coalesce(&mut self, max_bytes: usize) {
        while self.pending.len() < max_bytes {
            match self.output.try_recv() {
                Ok(chunk) => self.pending.extend(chunk),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.ended = true;
                    break;
                }
            }
        }
    }

    /// Takes the longest prefix that can be handed out now, if any.
    fn take_ready(&mut self, max_bytes: usize) -> Option<Vec<u8>> {
        let cut = utf8_boundary(&self.pending, max_bytes.max(1), self.ended);
        if cut == 0 {
            return None;
        }
        Some(self.pending.drain(..cut).collect())
    }
}

fn pump<R>(mut reader: R, tx: UnboundedSender<Vec<u8>>, stream: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; PUMP_BUFFER_BYTES];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!("Shell {} read failed: {}", stream, e);
                    break;
                }
            }
        }
    });
}

/// Largest cut point `<= max` that does not split a UTF-8 sequence.
///
/// An incomplete sequence at the end of `bytes` is held back until the rest
/// arrives, unless the stream has ended or `max` is smaller than the sequence.
/// Invalid bytes are cut at `max` so they still drain.
fn utf8_boundary(bytes: &[u8], max: usize, at_end: bool) -> usize {
    let cut = max.min(bytes.len());
    match std::str::from_utf8(&bytes[..cut]) {
        Ok(_) => cut,
        Err(e) if e.error_len().is_some() => cut,
        Err(e) if e.valid_up_to() > 0 => e.valid_up_to(),
        Err(_) if at_end || cut < bytes.len() => cut,
        Err(_) => 0,
    }
}

#[async_trait]
impl ShellChannel for ProcessChannel {
    async fn send_text(&mut self, text: &str) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| RunnerError::transport("shell input is closed"))?;
        stdin
            .write_all(text.as_bytes())
            .await
            .map_err(|e| RunnerError::transport(format!("failed to write to shell: {e}")))?;
        stdin
            .flush()
            .await
            .map_err(|e| RunnerError::transport(format!("failed to flush shell input: {e}")))
    }

    fn has_data_available(&mut self) -> Result<bool> {
        self.coalesce(usize::MAX);
        if utf8_boundary(&self.pending, self.pending.len(), self.ended) > 0 {
            return Ok(true);
        }
        if self.ended {
            return Err(RunnerError::transport("shell output stream ended"));
        }
        Ok(false)
    }

    async fn read_chunk(&mut self, max_bytes: usize) -> Result<Vec<u8>> {
        loop {
            // Coalesce whatever else already arrived, up to the requested size.
            self.coalesce(max_bytes);
            if let Some(chunk) = self.take_ready(max_bytes) {
                return Ok(chunk);
            }
            if self.ended {
                return Err(RunnerError::transport("shell output stream ended"));
            }
            self.receive().await;
        }
    }

    async fn read_chunk_timeout(
        &mut self,
        max_bytes: usize,
        wait: Duration,
    ) -> Result<Option<Vec<u8>>> {
        match tokio::time::timeout(wait, self.read_chunk(max_bytes)).await {
            Ok(chunk) => chunk.map(Some),
            Err(_) => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Some(mut stdin) = self.stdin.take() {
            let _ = stdin.shutdown().await;
        }
        if let Err(e) = self.child.kill().await {
            debug!("Shell process already gone: {}", e);
        }
        Ok(())
    }
}
