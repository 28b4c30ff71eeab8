//! # Non-blocking broadcast of output chunks.
//!
//! [`Broadcast`] fans each chunk of child output out to a dynamic set of
//! sinks: the local terminal, the scrollback ring, and every attached
//! connection. The child's output pipe must never stall because one client
//! is slow, so each sink is a bounded queue drained by its own task and
//! [`Broadcast::write`] only ever does a `try_send`.
//!
//! ## Rules
//! - **Never blocks**: a sink whose queue is full loses that chunk; the
//!   writer does not wait.
//! - **Never partially fails**: `write` has no error path; the caller's copy
//!   loop cannot be poisoned by a dying client.
//! - **Self-pruning**: a sink whose drain task has ended (client closed the
//!   channel) is removed on the next write.
//! - Adding a sink is safe concurrently with in-progress writes.

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Mutex;

/// Queue depth per sink. At the pump chunk size this bounds the memory a
/// lagging client can hold to a few hundred KiB.
pub(crate) const SINK_DEPTH: usize = 64;

/// Dynamic sink set with non-blocking fan-out.
pub struct Broadcast {
    sinks: Mutex<Vec<mpsc::Sender<Bytes>>>,
}

impl Broadcast {
    /// Creates a broadcast with no sinks.
    pub fn new() -> Self {
        Self {
            sinks: Mutex::new(Vec::new()),
        }
    }

    /// Registers a pre-built sink channel.
    ///
    /// Used when one consumer should appear in several broadcasts at once:
    /// an attached connection registers the same sender on the stdout and
    /// stderr broadcasts so a single task writes its socket.
    pub async fn add_sender(&self, tx: mpsc::Sender<Bytes>) {
        self.sinks.lock().await.push(tx);
    }

    /// Registers `writer` as a sink, spawning its drain task.
    pub async fn add_writer<W>(&self, writer: W)
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::channel(SINK_DEPTH);
        self.add_sender(tx).await;
        tokio::spawn(drain(rx, writer));
    }

    /// Queues `chunk` on every sink without waiting.
    ///
    /// A full queue drops the chunk for that sink only; a closed queue
    /// drops the sink itself.
    pub async fn write(&self, chunk: Bytes) {
        let mut sinks = self.sinks.lock().await;
        sinks.retain(|tx| match tx.try_send(chunk.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Closed(_)) => false,
        });
    }

    /// Number of registered sinks.
    pub async fn sink_count(&self) -> usize {
        self.sinks.lock().await.len()
    }
}

impl Default for Broadcast {
    fn default() -> Self {
        Self::new()
    }
}

/// Drains a sink queue into `writer` until the queue closes or a write
/// fails. A failed write ends the task; the broadcast notices the closed
/// queue on its next write and prunes the sink.
pub(crate) async fn drain<W>(mut rx: mpsc::Receiver<Bytes>, mut writer: W)
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    while let Some(chunk) = rx.recv().await {
        if writer.write_all(&chunk).await.is_err() {
            break;
        }
    }
}
