//! # Pump-backed non-blocking reader.
//!
//! [`NonBlockingReader`] turns a blocking stream read into one that returns
//! immediately: a pump task reads the underlying stream into a bounded
//! channel, and [`NonBlockingReader::read`] only drains bytes that are
//! already staged. This is what keeps the fan-in rotation live when one
//! attached client goes silent for hours.
//!
//! ## Rules
//! - A zero-byte [`SourceRead::Data`] means "nothing staged right now", not
//!   end of stream.
//! - [`SourceRead::Closed`] is reported only after the pump has observed
//!   EOF/error on the stream **and** every staged byte has been drained, so
//!   output produced before a disconnect is never lost.
//! - The channel is bounded: a source that produces faster than the fan-in
//!   drains is backpressured inside its own pump, not inside the rotation.

use bytes::{Buf, Bytes};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;

/// Read size of the pump task, and the largest chunk it stages at once.
const PUMP_CHUNK: usize = 8 * 1024;

/// Staged chunks per source; bounds memory held for a slow consumer.
const PUMP_QUEUE: usize = 32;

/// Result of a single non-blocking read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRead {
    /// `n` bytes were copied out; `0` means nothing was staged (try again).
    Data(usize),
    /// The stream ended or failed and all staged bytes are drained. The
    /// source can be dropped from its rotation.
    Closed,
}

/// A reader that never waits: bytes come from a bounded staging queue
/// filled by a background pump task.
pub struct NonBlockingReader {
    rx: mpsc::Receiver<Bytes>,
    /// Remainder of a chunk that did not fit the caller's buffer.
    staged: Bytes,
    pump: JoinHandle<()>,
}

impl NonBlockingReader {
    /// Wraps `source`, spawning the pump task.
    ///
    /// The pump stops on the first EOF or read error; the distinction does
    /// not matter to the rotation, both mean "this source is done".
    pub fn new<R>(mut source: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::channel::<Bytes>(PUMP_QUEUE);
        let pump = tokio::spawn(async move {
            let mut chunk = vec![0u8; PUMP_CHUNK];
            loop {
                match source.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if tx.send(Bytes::copy_from_slice(&chunk[..n])).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });
        Self {
            rx,
            staged: Bytes::new(),
            pump,
        }
    }

    /// Copies staged bytes into `buf` without waiting.
    ///
    /// Fills from the staging queue until `buf` is full or the queue is
    /// momentarily empty. See [`SourceRead`] for the end-of-stream contract.
    pub fn read(&mut self, buf: &mut [u8]) -> SourceRead {
        if buf.is_empty() {
            return SourceRead::Data(0);
        }

        let mut filled = 0;
        loop {
            if filled == buf.len() {
                return SourceRead::Data(filled);
            }
            if self.staged.is_empty() {
                match self.rx.try_recv() {
                    Ok(chunk) => self.staged = chunk,
                    Err(TryRecvError::Empty) => return SourceRead::Data(filled),
                    Err(TryRecvError::Disconnected) => {
                        return if filled > 0 {
                            SourceRead::Data(filled)
                        } else {
                            SourceRead::Closed
                        };
                    }
                }
            }
            let n = (buf.len() - filled).min(self.staged.len());
            buf[filled..filled + n].copy_from_slice(&self.staged[..n]);
            self.staged.advance(n);
            filled += n;
        }
    }
}

impl Drop for NonBlockingReader {
    fn drop(&mut self) {
        self.pump.abort();
    }
}
