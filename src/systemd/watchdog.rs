//! # Periodic liveness ticker.
//!
//! When the manager advertises a watchdog interval (`WATCHDOG_USEC`, with an
//! optional `WATCHDOG_PID` constraint), the supervisor pings `WATCHDOG=1`
//! immediately and then on every interval tick, for as long as the child is
//! running. The ticker is a spawned task holding a [`CancellationToken`];
//! the supervisor cancels it exactly once at child exit, and cancellation
//! always wins a tie against a due tick, so no ping is ever sent after the
//! token is observed cancelled.

use std::env;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::NotifyError;
use crate::systemd::notify;

/// Consulted before each ping; returning `false` suppresses that ping,
/// letting the caller withhold liveness when the child looks unhealthy.
pub type WatchdogCallback = Arc<dyn Fn() -> bool + Send + Sync>;

/// Returns the manager-advertised watchdog interval, if the watchdog
/// applies to this process.
///
/// `Ok(None)` means inactive: either no interval is advertised, or
/// `WATCHDOG_PID` names a different process. A pid mismatch is not an
/// error; the manager simply armed the watchdog for someone else.
pub fn interval() -> Result<Option<Duration>, NotifyError> {
    let usec = match env::var("WATCHDOG_USEC") {
        Ok(value) if !value.is_empty() => value,
        _ => return Ok(None),
    };
    let usec: u64 = usec
        .parse()
        .map_err(|_| NotifyError::InvalidWatchdog { value: usec })?;

    if let Ok(pid) = env::var("WATCHDOG_PID") {
        if !pid.is_empty() {
            let pid: u32 = pid
                .parse()
                .map_err(|_| NotifyError::InvalidWatchdog { value: pid })?;
            if pid != process::id() {
                return Ok(None);
            }
        }
    }
    Ok(Some(Duration::from_micros(usec)))
}

/// Starts the liveness ticker if the watchdog is active.
///
/// Sends one ping up front, then spawns a task that pings on every interval
/// tick until `token` is cancelled. Returns `Ok(false)` when the watchdog
/// is inactive, `Ok(true)` when the ticker was started.
pub fn spawn_ticker(
    token: CancellationToken,
    callback: Option<WatchdogCallback>,
) -> Result<bool, NotifyError> {
    let Some(period) = interval()? else {
        return Ok(false);
    };
    notify::watchdog()?;

    tokio::spawn(async move {
        let mut tick = time::interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() fires immediately once; that ping was already sent.
        tick.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tick.tick() => {
                    if callback.as_ref().map_or(true, |approve| approve()) {
                        if let Err(err) = notify::watchdog() {
                            log::warn!("watchdog ping failed: {err}");
                        }
                    }
                }
            }
        }
    });
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systemd::testenv;
    use std::os::unix::net::UnixDatagram;

    #[test]
    fn test_interval_parses_microseconds() {
        let _env = testenv::lock();
        env::set_var("WATCHDOG_USEC", "500000");
        env::remove_var("WATCHDOG_PID");
        assert_eq!(interval().unwrap(), Some(Duration::from_millis(500)));
        env::remove_var("WATCHDOG_USEC");
    }

    #[test]
    fn test_matching_pid_keeps_watchdog_active() {
        let _env = testenv::lock();
        env::set_var("WATCHDOG_USEC", "500000");
        env::set_var("WATCHDOG_PID", process::id().to_string());
        assert_eq!(interval().unwrap(), Some(Duration::from_millis(500)));
        env::remove_var("WATCHDOG_USEC");
        env::remove_var("WATCHDOG_PID");
    }

    #[test]
    fn test_foreign_pid_disables_without_error() {
        let _env = testenv::lock();
        env::set_var("WATCHDOG_USEC", "500000");
        env::set_var("WATCHDOG_PID", (process::id() + 1).to_string());
        assert_eq!(interval().unwrap(), None);
        env::remove_var("WATCHDOG_USEC");
        env::remove_var("WATCHDOG_PID");
    }

    #[test]
    fn test_unparsable_interval_is_an_error() {
        let _env = testenv::lock();
        env::set_var("WATCHDOG_USEC", "soon");
        assert!(matches!(
            interval(),
            Err(NotifyError::InvalidWatchdog { .. })
        ));
        env::remove_var("WATCHDOG_USEC");
    }

    #[test]
    fn test_absent_interval_means_inactive() {
        let _env = testenv::lock();
        env::remove_var("WATCHDOG_USEC");
        assert_eq!(interval().unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_ticker_pings_until_cancelled() {
        let _env = testenv::lock();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notify.sock");
        let manager = UnixDatagram::bind(&path).unwrap();
        manager
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        env::set_var("NOTIFY_SOCKET", &path);
        env::set_var("WATCHDOG_USEC", "20000"); // 20ms
        env::remove_var("WATCHDOG_PID");

        let token = CancellationToken::new();
        assert!(spawn_ticker(token.clone(), None).unwrap());

        // Immediate ping plus at least one periodic ping. The ticker task
        // runs on the second worker thread while this one blocks on recv.
        let mut buf = [0u8; 32];
        for _ in 0..2 {
            let n = manager.recv(&mut buf).unwrap();
            assert_eq!(&buf[..n], b"WATCHDOG=1");
        }

        token.cancel();
        env::remove_var("NOTIFY_SOCKET");
        env::remove_var("WATCHDOG_USEC");
    }

    #[test]
    fn test_inactive_watchdog_starts_nothing() {
        let _env = testenv::lock();
        env::remove_var("WATCHDOG_USEC");
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let _guard = rt.enter();
        assert!(!spawn_ticker(CancellationToken::new(), None).unwrap());
    }
}
