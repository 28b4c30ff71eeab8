//! Service-manager integration: notify protocol and watchdog ticker.
//!
//! Implements the textual datagram protocol an init-style manager uses to
//! track this supervisor: readiness, liveness pings, status text, and
//! errno-style failure codes. Everything here is fire-and-forget and
//! best-effort; a missing manager is a normal condition, never an error.
//!
//! Internal modules:
//! - [`notify`]: one `KEY=VALUE` line per datagram to `NOTIFY_SOCKET`;
//! - [`watchdog`]: `WATCHDOG_USEC`/`WATCHDOG_PID` parsing and the periodic
//!   liveness ticker.

pub mod notify;
pub mod watchdog;

pub use watchdog::{spawn_ticker, WatchdogCallback};

#[cfg(test)]
pub(crate) mod testenv {
    use std::sync::{Mutex, MutexGuard};

    /// Serializes tests that mutate process-wide environment variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    pub(crate) fn lock() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
