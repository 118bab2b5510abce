//! Transports carrying protocol lines to and from the engine
//!
//! The session is generic over [`EngineTransport`] so tests can swap the
//! real engine process for an in-memory channel pair. Both directions work
//! in whole lines; framing (newlines) is the transport's business.

use crate::error::{ChessCoreError, ChessCoreResult};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;

/// Bidirectional line-oriented link to an engine
#[async_trait]
pub trait EngineTransport: Send {
    /// Send one protocol line (without trailing newline)
    async fn send_line(&mut self, line: &str) -> ChessCoreResult<()>;

    /// Receive the next line, or `None` once the peer has closed
    async fn recv_line(&mut self) -> ChessCoreResult<Option<String>>;
}

/// In-memory transport over a pair of bounded channels
///
/// [`ChannelTransport::pair`] returns two cross-wired halves; tests drive
/// one half from a spawned task standing in for the engine.
#[derive(Debug)]
pub struct ChannelTransport {
    tx: mpsc::Sender<String>,
    rx: mpsc::Receiver<String>,
}

impl ChannelTransport {
    /// Create two connected transports
    pub fn pair(buffer: usize) -> (ChannelTransport, ChannelTransport) {
        let (a_tx, a_rx) = mpsc::channel(buffer);
        let (b_tx, b_rx) = mpsc::channel(buffer);
        (
            ChannelTransport { tx: a_tx, rx: b_rx },
            ChannelTransport { tx: b_tx, rx: a_rx },
        )
    }
}

#[async_trait]
impl EngineTransport for ChannelTransport {
    async fn send_line(&mut self, line: &str) -> ChessCoreResult<()> {
        self.tx
            .send(line.to_string())
            .await
            .map_err(|_| ChessCoreError::EngineDisconnected)
    }

    async fn recv_line(&mut self) -> ChessCoreResult<Option<String>> {
        Ok(self.rx.recv().await)
    }
}

/// Transport over a spawned engine process's stdio
pub struct ProcessTransport {
    child: Child,
    stdin: ChildStdin,
    stdout: tokio::io::Lines<BufReader<ChildStdout>>,
}

impl ProcessTransport {
    /// Spawn `program` and attach to its stdin/stdout
    pub fn spawn(program: &str) -> ChessCoreResult<ProcessTransport> {
        let mut child = Command::new(program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        let stdin = child.stdin.take().ok_or(ChessCoreError::EngineDisconnected)?;
        let stdout = child
            .stdout
            .take()
            .ok_or(ChessCoreError::EngineDisconnected)?;
        Ok(ProcessTransport {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        })
    }

    /// Whether the engine process is still running
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

#[async_trait]
impl EngineTransport for ProcessTransport {
    async fn send_line(&mut self, line: &str) -> ChessCoreResult<()> {
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn recv_line(&mut self) -> ChessCoreResult<Option<String>> {
        Ok(self.stdout.next_line().await?)
    }
}
