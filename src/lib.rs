//! # procmux
//!
//! **procmux** supervises a single child process and multiplexes its stdio:
//! stdout/stderr are mirrored to the local terminal, to a bounded scrollback
//! of recent output lines, and to any number of dynamically attaching socket
//! clients; everything those clients send is fanned back into the child's
//! stdin. Process lifecycle (readiness, liveness) is reported to an
//! init-style manager over the systemd notify protocol.
//!
//! ## Architecture
//! ```text
//!                       child stdout          child stderr
//!                            │                     │
//!                            ▼                     ▼
//!                     ┌─────────────┐       ┌─────────────┐
//!                     │  Broadcast  │       │  Broadcast  │
//!                     │  (stdout)   │       │  (stderr)   │
//!                     └──┬───┬───┬──┘       └──┬───┬───┬──┘
//!                        │   │   │             │   │   │
//!              terminal ◄┘   │   └► conn N ◄───┘   │   └► conn M
//!                            ▼                     ▼
//!                     ┌─────────────────────────────┐
//!                     │   Scrollback (line ring)    │──► replayed on attach
//!                     └─────────────────────────────┘
//!
//!   conn 1 ──┐
//!   conn 2 ──┼──► FanIn (round-robin) ──► child stdin
//!   stdin  ──┘
//!
//!   AttachServer: accept ──► replay scrollback ──► register sink + source
//!   systemd: READY=1 on start, WATCHDOG=1 ticker until the child exits
//! ```
//!
//! ## Key pieces
//! - [`Scrollback`]: bounded ring of the most recent output lines.
//! - [`Broadcast`]: non-blocking fan-out of output chunks to sinks.
//! - [`FanIn`] / [`NonBlockingReader`]: fair aggregation of input sources.
//! - [`AttachServer`]: accept loop that wires new connections into both sets.
//! - [`Host`]: owns the child process lifecycle and the copy tasks.
//! - [`systemd`]: notification client and watchdog ticker.

mod attach;
mod config;
mod error;
mod host;
mod io;

pub mod systemd;

// ---- Public re-exports ----

pub use attach::{AttachServer, ListenAddr, Listener};
pub use config::HostConfig;
pub use error::{HostError, NotifyError};
pub use host::Host;
pub use io::{Broadcast, FanIn, FanInRead, NonBlockingReader, Scrollback, SourceRead};
