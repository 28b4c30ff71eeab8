//! Stream plumbing: scrollback, broadcast fan-out, and stdin fan-in.
//!
//! This module contains the shared structures the copy tasks and the attach
//! server communicate through. Each structure owns its own mutual-exclusion
//! boundary; nothing in here is reachable except through its owning handle.
//!
//! Internal modules:
//! - [`scrollback`]: bounded line ring replayed to newly attached clients;
//! - [`broadcast`]: non-blocking fan-out of output chunks to a sink set;
//! - [`fanin`]: round-robin aggregation of input sources into one stream;
//! - [`nonblocking`]: pump-backed reader so one silent client never stalls
//!   the fan-in rotation.

mod broadcast;
mod fanin;
mod nonblocking;
mod scrollback;

pub use broadcast::Broadcast;
pub(crate) use broadcast::drain;
pub use fanin::{FanIn, FanInRead};
pub use nonblocking::{NonBlockingReader, SourceRead};
pub use scrollback::Scrollback;
