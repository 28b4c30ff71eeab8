//! # Round-robin fan-in of input sources.
//!
//! [`FanIn`] concatenates a dynamically growing set of [`NonBlockingReader`]
//! sources into one logical byte stream that feeds the child's stdin. A
//! persistent resume cursor gives every attached client's input a fair,
//! bounded-latency chance to reach the child instead of starving later
//! sources behind a perpetually busy first one (the local terminal is never
//! closed, so index 0 would otherwise always win).
//!
//! ## Rules
//! - Sources are read in a stable rotation starting at the resume cursor,
//!   wrapping around once per call.
//! - A read that fills the buffer returns early and resumes **after** the
//!   source that filled it, so no source is serviced twice in a row while
//!   another has pending data.
//! - Closed sources observed during a pass are removed after the pass, in
//!   descending index order so remaining indices stay valid.
//! - The aggregate stream ends permanently only when the source set becomes
//!   empty; a zero-byte pass with live sources is a "try again", not an end.
//! - [`FanIn::add_sources`] may race an in-flight read; a source missing the
//!   one rotation already past its insertion point is harmless.

use tokio::sync::Mutex;

use crate::io::nonblocking::{NonBlockingReader, SourceRead};

/// Result of one fan-in rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanInRead {
    /// `n` bytes were produced; `0` with live sources means "try again".
    Data(usize),
    /// The source set is empty; no more data, permanently.
    Done,
}

/// Aggregates input sources round-robin into a single stream.
///
/// The source sequence and the resume cursor share one mutex; adding sources
/// is safe concurrently with ongoing reads.
pub struct FanIn {
    inner: Mutex<Sources>,
}

struct Sources {
    readers: Vec<NonBlockingReader>,
    /// Rotation index the next read starts from.
    resume: usize,
}

impl FanIn {
    /// Creates an empty fan-in. The supervisor seeds it with its own stdin.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Sources {
                readers: Vec::new(),
                resume: 0,
            }),
        }
    }

    /// Appends sources to the rotation.
    pub async fn add_sources<I>(&self, sources: I)
    where
        I: IntoIterator<Item = NonBlockingReader>,
    {
        let mut inner = self.inner.lock().await;
        inner.readers.extend(sources);
    }

    /// Number of sources currently in the rotation.
    pub async fn source_count(&self) -> usize {
        self.inner.lock().await.readers.len()
    }

    /// Attempts to fill `buf` from the sources, starting at the resume
    /// cursor and wrapping around once.
    ///
    /// Returns early the moment `buf` is full, recording where to resume.
    /// Otherwise completes the pass, prunes sources that reported
    /// [`SourceRead::Closed`], and reports [`FanInRead::Done`] only if the
    /// set is empty afterwards.
    pub async fn read(&self, buf: &mut [u8]) -> FanInRead {
        let mut inner = self.inner.lock().await;
        let len = inner.readers.len();
        if len == 0 {
            return FanInRead::Done;
        }

        let start = inner.resume.min(len - 1);
        let mut filled = 0;
        let mut closed: Vec<usize> = Vec::new();

        for step in 0..len {
            let i = (start + step) % len;
            match inner.readers[i].read(&mut buf[filled..]) {
                SourceRead::Data(n) => {
                    filled += n;
                    if filled == buf.len() {
                        inner.resume = (i + 1) % len;
                        return FanInRead::Data(filled);
                    }
                }
                SourceRead::Closed => closed.push(i),
            }
        }
        inner.resume = 0;

        closed.sort_unstable();
        for &i in closed.iter().rev() {
            drop(inner.readers.remove(i));
        }
        if inner.readers.is_empty() {
            return FanInRead::Done;
        }
        FanInRead::Data(filled)
    }
}

impl Default for FanIn {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncWriteExt, DuplexStream};

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    /// Returns a fan-in source plus the write end feeding it.
    fn source() -> (DuplexStream, NonBlockingReader) {
        let (tx, rx) = tokio::io::duplex(1024);
        (tx, NonBlockingReader::new(rx))
    }

    #[tokio::test]
    async fn test_empty_set_is_permanently_done() {
        let fan_in = FanIn::new();
        let mut buf = [0u8; 8];
        assert_eq!(fan_in.read(&mut buf).await, FanInRead::Done);
    }

    #[tokio::test]
    async fn test_zero_bytes_with_live_source_is_not_an_end() {
        let fan_in = FanIn::new();
        let (_tx, reader) = source();
        fan_in.add_sources([reader]).await;

        let mut buf = [0u8; 8];
        assert_eq!(fan_in.read(&mut buf).await, FanInRead::Data(0));
        assert_eq!(fan_in.source_count().await, 1);
    }

    #[tokio::test]
    async fn test_failed_source_is_pruned_and_survivor_keeps_feeding() {
        let fan_in = FanIn::new();
        let (mut tx_a, reader_a) = source();
        let (mut tx_b, reader_b) = source();
        fan_in.add_sources([reader_a, reader_b]).await;

        tx_a.write_all(b"aa").await.unwrap();
        tx_b.write_all(b"bb").await.unwrap();
        settle().await;

        let mut buf = [0u8; 16];
        assert_eq!(fan_in.read(&mut buf).await, FanInRead::Data(4));

        // A disconnects; its closure is observed on the next pass.
        drop(tx_a);
        settle().await;
        assert_eq!(fan_in.read(&mut buf).await, FanInRead::Data(0));
        assert_eq!(fan_in.source_count().await, 1);

        tx_b.write_all(b"still here").await.unwrap();
        settle().await;
        let n = match fan_in.read(&mut buf).await {
            FanInRead::Data(n) => n,
            FanInRead::Done => panic!("survivor must keep the stream alive"),
        };
        assert_eq!(&buf[..n], b"still here");
    }

    #[tokio::test]
    async fn test_last_source_closing_ends_the_stream() {
        let fan_in = FanIn::new();
        let (tx, reader) = source();
        fan_in.add_sources([reader]).await;
        drop(tx);
        settle().await;

        let mut buf = [0u8; 8];
        assert_eq!(fan_in.read(&mut buf).await, FanInRead::Done);
        assert_eq!(fan_in.source_count().await, 0);
    }

    #[tokio::test]
    async fn test_round_robin_alternates_between_ready_sources() {
        let fan_in = FanIn::new();
        let (mut tx_a, reader_a) = source();
        let (mut tx_b, reader_b) = source();
        fan_in.add_sources([reader_a, reader_b]).await;

        tx_a.write_all(&[b'a'; 64]).await.unwrap();
        tx_b.write_all(&[b'b'; 64]).await.unwrap();
        settle().await;

        // Small reads against two always-ready sources must alternate which
        // one is drained first across consecutive calls.
        let mut first_bytes = Vec::new();
        for _ in 0..4 {
            let mut buf = [0u8; 4];
            match fan_in.read(&mut buf).await {
                FanInRead::Data(4) => first_bytes.push(buf[0]),
                other => panic!("expected a full buffer, got {other:?}"),
            }
        }
        assert_eq!(first_bytes, vec![b'a', b'b', b'a', b'b']);
    }

    #[tokio::test]
    async fn test_sources_added_mid_stream_join_the_rotation() {
        let fan_in = FanIn::new();
        let (_tx_a, reader_a) = source();
        fan_in.add_sources([reader_a]).await;

        let (mut tx_b, reader_b) = source();
        fan_in.add_sources([reader_b]).await;
        tx_b.write_all(b"late").await.unwrap();
        settle().await;

        let mut buf = [0u8; 8];
        assert_eq!(fan_in.read(&mut buf).await, FanInRead::Data(4));
        assert_eq!(&buf[..4], b"late");
    }
}
