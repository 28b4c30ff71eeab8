//! # Bounded line-oriented scrollback ring.
//!
//! [`Scrollback`] keeps the most recent `capacity` output lines of the child
//! process so that a newly attached client can be shown what happened just
//! before it connected.
//!
//! ## Rules
//! - Exactly one slot is "open" (receiving appended bytes) at any time; a
//!   slot closes the instant a `\n` is appended to it, terminator retained.
//! - Closing the open slot while the ring is full evicts the oldest slot;
//!   while not full, the cursor advances to the next (already empty) slot.
//! - `capacity == 0` accepts and silently discards all writes.
//! - Writes and snapshots are serialized under one mutex; a snapshot never
//!   observes a half-applied write.
//!
//! ## Example
//! ```rust
//! # use procmux::Scrollback;
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let ring = Scrollback::new(2);
//! ring.write(b"a\nb\nc\n").await;
//! let lines = ring.snapshot().await;
//! assert_eq!(&lines[0][..], b"b\n");
//! assert_eq!(&lines[1][..], b"c\n");
//! # }
//! ```

use std::collections::VecDeque;

use bytes::Bytes;
use tokio::sync::Mutex;

/// Fixed-capacity ring of output lines.
///
/// ### Properties
/// - **Infallible sink**: [`Scrollback::write`] always consumes all input.
/// - **Ordered**: [`Scrollback::snapshot`] returns slots oldest-first.
/// - **Fixed size**: capacity is set at construction and never resized.
pub struct Scrollback {
    inner: Mutex<Ring>,
}

struct Ring {
    /// Exactly `capacity` slots; empty slots are lines not yet written.
    slots: VecDeque<Vec<u8>>,
    /// Index of the open slot currently being appended to.
    cursor: usize,
}

impl Scrollback {
    /// Creates a ring with `capacity` line slots.
    pub fn new(capacity: usize) -> Self {
        let mut slots = VecDeque::with_capacity(capacity);
        slots.resize(capacity, Vec::new());
        Self {
            inner: Mutex::new(Ring { slots, cursor: 0 }),
        }
    }

    /// Appends `bytes` to the ring, splitting on line terminators.
    ///
    /// Each `\n` closes the open slot (the terminator is stored as part of
    /// the line) and advances the cursor, evicting the oldest line when the
    /// ring is full. Trailing bytes without a terminator are left pending in
    /// the open slot for the next write.
    ///
    /// Never fails and never rejects input, matching the sink contract of
    /// the broadcast writer feeding it.
    pub async fn write(&self, mut bytes: &[u8]) {
        let mut ring = self.inner.lock().await;
        if ring.slots.is_empty() {
            return;
        }

        while !bytes.is_empty() {
            // A terminated open slot means the previous write finished a
            // line; rotate before appending anything new.
            if ring.slots[ring.cursor].last() == Some(&b'\n') {
                if ring.cursor == ring.slots.len() - 1 {
                    ring.slots.pop_front();
                    ring.slots.push_back(Vec::new());
                } else {
                    ring.cursor += 1;
                }
            }

            let take = match bytes.iter().position(|&b| b == b'\n') {
                Some(nl) => nl + 1,
                None => bytes.len(),
            };
            let cursor = ring.cursor;
            ring.slots[cursor].extend_from_slice(&bytes[..take]);
            bytes = &bytes[take..];
        }
    }

    /// Returns a copy of all `capacity` slots, oldest-first.
    ///
    /// Empty slots (lines never written) are included so the caller can
    /// distinguish "no history yet" from "empty line"; replay skips them.
    pub async fn snapshot(&self) -> Vec<Bytes> {
        let ring = self.inner.lock().await;
        ring.slots
            .iter()
            .map(|line| Bytes::copy_from_slice(line))
            .collect()
    }

    /// Number of line slots in the ring.
    pub async fn capacity(&self) -> usize {
        self.inner.lock().await.slots.len()
    }
}
