//! # sd_notify-style datagram client.
//!
//! Each call sends exactly one `KEY=VALUE` line as one datagram to the
//! manager's unix socket named by `NOTIFY_SOCKET`. Both abstract-namespace
//! addresses (leading `@`) and filesystem paths are supported. There is no
//! reply and no correlation; every helper is fire-and-forget.
//!
//! Absence of `NOTIFY_SOCKET` means no manager is supervising us, which all
//! helpers report as `Ok(false)` so standalone runs stay silent. A socket
//! address that is present but malformed, or a failed send, is an error to
//! the immediate caller, but callers never escalate it: liveness reporting
//! is best-effort by design.

use std::env;
use std::os::unix::net::UnixDatagram;

use libc::c_int;

use crate::error::NotifyError;

/// Environment variable naming the manager's datagram socket.
const NOTIFY_SOCKET: &str = "NOTIFY_SOCKET";

/// Sends `message` as a single datagram to the manager.
///
/// Returns `Ok(false)` when no manager is configured, `Ok(true)` when the
/// datagram was handed to the socket.
pub fn notify(message: &str) -> Result<bool, NotifyError> {
    let socket = match env::var(NOTIFY_SOCKET) {
        Ok(value) if !value.is_empty() => value,
        _ => return Ok(false),
    };
    if socket.len() <= 1 || !(socket.starts_with('/') || socket.starts_with('@')) {
        return Err(NotifyError::InvalidSocket { socket });
    }

    let conn = UnixDatagram::unbound().map_err(NotifyError::Send)?;
    let sent = match socket.strip_prefix('@') {
        Some(name) => send_abstract(&conn, name, message.as_bytes()),
        None => conn.send_to(message.as_bytes(), &socket),
    };
    sent.map_err(NotifyError::Send)?;
    Ok(true)
}

#[cfg(target_os = "linux")]
fn send_abstract(conn: &UnixDatagram, name: &str, payload: &[u8]) -> std::io::Result<usize> {
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::SocketAddr;

    let addr = SocketAddr::from_abstract_name(name.as_bytes())?;
    conn.send_to_addr(payload, &addr)
}

#[cfg(not(target_os = "linux"))]
fn send_abstract(_conn: &UnixDatagram, _name: &str, _payload: &[u8]) -> std::io::Result<usize> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "abstract socket addresses require linux",
    ))
}

/// Tells the manager the service finished starting up.
pub fn ready() -> Result<bool, NotifyError> {
    notify("READY=1")
}

/// Sends a keep-alive ping; see [`crate::systemd::watchdog`].
pub fn watchdog() -> Result<bool, NotifyError> {
    notify("WATCHDOG=1")
}

/// Passes a single-line, human-readable service status to the manager.
///
/// The protocol is one message per line, so text containing a line
/// terminator is rejected and nothing is sent.
pub fn status(text: &str) -> Result<bool, NotifyError> {
    if text.contains(['\n', '\r']) {
        return Err(NotifyError::InvalidStatus);
    }
    notify(&format!("STATUS={text}"))
}

/// Reports an errno-style failure code.
pub fn errno(code: c_int) -> Result<bool, NotifyError> {
    notify(&format!("ERRNO={code}"))
}

/// Reports the main pid of the service, in case this process is not it.
pub fn main_pid(pid: u32) -> Result<bool, NotifyError> {
    notify(&format!("MAINPID={pid}"))
}
