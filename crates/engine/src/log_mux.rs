// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log multiplexer: one byte stream out to console, audit file, and live channel.
//!
//! Console and audit-file writes happen inline, in order, each bounded by the
//! I/O timeout. Broadcast publication is handed to a separate forwarding task
//! over an unbounded channel, so a slow or failing live viewer can neither
//! stall the container pump nor lose audit-file output. Broadcast text is cut
//! on UTF-8 character boundaries; a character split across chunks is held
//! back until the rest arrives.

use ob_adapters::{log_channel, LogBroadcaster};
use ob_core::JobId;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Errors from audit log persistence
#[derive(Debug, Error)]
pub enum LogError {
    #[error("audit log {} unavailable: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("audit log write failed: {0}")]
    Write(#[source] std::io::Error),
    #[error("audit log write timed out after {0:?}")]
    Timeout(Duration),
}

/// Where the console copy of job output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Console {
    #[default]
    Stdout,
    Silent,
}

/// Sink for the console copy.
pub type ConsoleWriter = Box<dyn AsyncWrite + Send + Unpin>;

struct MuxInner {
    audit: Mutex<File>,
    audit_path: PathBuf,
    console: Option<Mutex<ConsoleWriter>>,
    io_timeout: Duration,
    /// Trailing bytes of an incomplete UTF-8 character.
    utf8_carry: parking_lot::Mutex<Vec<u8>>,
    broadcast_tx: parking_lot::Mutex<Option<mpsc::UnboundedSender<String>>>,
    forwarder: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

/// Fan-out for one job's output. Cheap to clone; clones share the audit file.
///
/// Callers must keep a single producer at a time so chunk order holds.
#[derive(Clone)]
pub struct LogMultiplexer {
    inner: Arc<MuxInner>,
}

impl LogMultiplexer {
    /// Open the job's audit log in append mode and start the broadcast forwarder.
    pub async fn open<B: LogBroadcaster>(
        job_id: &JobId,
        audit_path: &Path,
        broadcaster: B,
        console: Console,
        io_timeout: Duration,
    ) -> Result<Self, LogError> {
        let writer: Option<ConsoleWriter> = match console {
            Console::Stdout => Some(Box::new(tokio::io::stdout())),
            Console::Silent => None,
        };
        Self::open_with_console(job_id, audit_path, broadcaster, writer, io_timeout).await
    }

    /// Like [`Self::open`], with an explicit console sink.
    pub async fn open_with_console<B: LogBroadcaster>(
        job_id: &JobId,
        audit_path: &Path,
        broadcaster: B,
        console: Option<ConsoleWriter>,
        io_timeout: Duration,
    ) -> Result<Self, LogError> {
        let audit = OpenOptions::new()
            .create(true)
            .append(true)
            .open(audit_path)
            .await
            .map_err(|source| LogError::Open {
                path: audit_path.to_path_buf(),
                source,
            })?;

        let channel = log_channel(job_id);
        let (broadcast_tx, rx) = mpsc::unbounded_channel();
        let forwarder = tokio::spawn(forward(broadcaster, channel, rx, io_timeout));

        Ok(Self {
            inner: Arc::new(MuxInner {
                audit: Mutex::new(audit),
                audit_path: audit_path.to_path_buf(),
                console: console.map(Mutex::new),
                io_timeout,
                utf8_carry: parking_lot::Mutex::new(Vec::new()),
                broadcast_tx: parking_lot::Mutex::new(Some(broadcast_tx)),
                forwarder: parking_lot::Mutex::new(Some(forwarder)),
            }),
        })
    }

    pub fn audit_path(&self) -> &Path {
        &self.inner.audit_path
    }

    /// Write one chunk to every sink.
    ///
    /// Returns an error only when the audit file could not be written; the
    /// console and broadcast copies are best-effort.
    pub async fn write(&self, chunk: &[u8]) -> Result<(), LogError> {
        if chunk.is_empty() {
            return Ok(());
        }
        if let Some(console) = &self.inner.console {
            let mut console = console.lock().await;
            let written = tokio::time::timeout(self.inner.io_timeout, async {
                console.write_all(chunk).await?;
                console.flush().await
            })
            .await;
            match written {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::debug!(error = %e, "console write failed"),
                Err(_) => tracing::debug!("console write timed out"),
            }
        }

        let persisted = {
            let mut audit = self.inner.audit.lock().await;
            tokio::time::timeout(self.inner.io_timeout, async {
                audit.write_all(chunk).await?;
                audit.flush().await
            })
            .await
        };

        // Queued even when the file write fails; viewers still see output.
        let text = {
            let mut carry = self.inner.utf8_carry.lock();
            carry.extend_from_slice(chunk);
            let complete = carry.len() - incomplete_utf8_tail(&carry);
            let tail = carry.split_off(complete);
            let text = String::from_utf8_lossy(&carry).into_owned();
            *carry = tail;
            text
        };
        if !text.is_empty() {
            self.queue_broadcast(text);
        }

        match persisted {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(LogError::Write(e)),
            Err(_) => Err(LogError::Timeout(self.inner.io_timeout)),
        }
    }

    fn queue_broadcast(&self, text: String) {
        if let Some(tx) = self.inner.broadcast_tx.lock().as_ref() {
            if tx.send(text).is_err() {
                tracing::debug!(path = %self.inner.audit_path.display(), "broadcast forwarder gone");
            }
        }
    }

    /// Write a full line, adding the trailing newline.
    pub async fn line(&self, text: &str) -> Result<(), LogError> {
        self.write(format!("{text}\n").as_bytes()).await
    }

    /// Flush the audit file and wait (bounded) for queued broadcasts to drain.
    ///
    /// Later writes still reach the console and audit file but are no longer
    /// broadcast.
    pub async fn close(&self) -> Result<(), LogError> {
        let flushed = {
            let audit = self.inner.audit.lock().await;
            tokio::time::timeout(self.inner.io_timeout, audit.sync_all()).await
        };

        let leftover = std::mem::take(&mut *self.inner.utf8_carry.lock());
        if !leftover.is_empty() {
            self.queue_broadcast(String::from_utf8_lossy(&leftover).into_owned());
        }

        // Dropping the sender lets the forwarder drain and exit.
        self.inner.broadcast_tx.lock().take();
        let forwarder = self.inner.forwarder.lock().take();
        if let Some(handle) = forwarder {
            let abort = handle.abort_handle();
            if tokio::time::timeout(self.inner.io_timeout, handle).await.is_err() {
                tracing::warn!(path = %self.inner.audit_path.display(), "broadcast backlog abandoned");
                abort.abort();
            }
        }

        match flushed {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(LogError::Write(e)),
            Err(_) => Err(LogError::Timeout(self.inner.io_timeout)),
        }
    }
}

/// Number of trailing bytes that start a UTF-8 character not yet complete.
fn incomplete_utf8_tail(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - back];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let width = match byte {
            0xF0..=0xFF => 4,
            0xE0..=0xEF => 3,
            0xC0..=0xDF => 2,
            _ => 1,
        };
        return if width > back { back } else { 0 };
    }
    0
}

async fn forward<B: LogBroadcaster>(
    broadcaster: B,
    channel: String,
    mut rx: mpsc::UnboundedReceiver<String>,
    io_timeout: Duration,
) {
    while let Some(message) = rx.recv().await {
        match tokio::time::timeout(io_timeout, broadcaster.publish(&channel, &message)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(channel, error = %e, "broadcast publish failed"),
            Err(_) => tracing::debug!(channel, "broadcast publish timed out"),
        }
    }
}

#[cfg(test)]
#[path = "log_mux_tests.rs"]
mod tests;
