//! Error types used by the procmux supervisor.
//!
//! This module defines two main error enums:
//!
//! - [`HostError`] — fatal supervisor failures (configuration, startup, bind).
//! - [`NotifyError`] — failures of the systemd notification client.
//!
//! Every [`HostError`] maps to an errno-style code via [`HostError::errno`],
//! which is what the supervisor reports to the service manager (`ERRNO=<n>`)
//! before exiting non-zero. Per-connection failures never surface here; they
//! are absorbed by the broadcast/fan-in structures dropping the connection.

use std::io;

use libc::c_int;
use thiserror::Error;

/// # Fatal supervisor errors.
///
/// These are detected before or while starting the child process. Each one is
/// reported to stderr, mirrored to the service manager as `ERRNO=<code>`, and
/// terminates the supervisor with a non-zero exit status. The child's own
/// exit status is never represented here.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HostError {
    /// Executable path is empty, relative, or otherwise unusable.
    #[error("invalid executable path: {path:?}")]
    InvalidExec {
        /// The rejected path as given on the command line.
        path: String,
    },

    /// Parent directory of the executable does not exist.
    #[error("executable parent directory does not exist: {path}")]
    ExecDirMissing {
        /// The missing directory.
        path: String,
    },

    /// Parent of the executable exists but is not a directory.
    #[error("executable parent directory is not a directory: {path}")]
    ExecDirNotDir {
        /// The offending path.
        path: String,
    },

    /// The executable itself does not exist.
    #[error("executable does not exist: {path}")]
    ExecMissing {
        /// The missing executable path.
        path: String,
    },

    /// Listen address is too short or not parseable as path/host:port.
    #[error("invalid listen path/address: {addr:?}")]
    InvalidListen {
        /// The rejected address string.
        addr: String,
    },

    /// Directory that should hold the unix socket does not exist.
    #[error("socket directory does not exist: {path}")]
    SocketDirMissing {
        /// The missing directory.
        path: String,
    },

    /// Path that should hold the unix socket exists but is not a directory.
    #[error("socket directory is not a directory: {path}")]
    SocketDirNotDir {
        /// The offending path.
        path: String,
    },

    /// A file already occupies the requested unix socket path.
    #[error("socket already exists: {path}")]
    SocketExists {
        /// The occupied socket path.
        path: String,
    },

    /// Binding the attach listener failed. The operator asked for this
    /// endpoint explicitly, so the whole supervisor goes down.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that could not be bound.
        addr: String,
        /// Underlying bind error.
        source: io::Error,
    },

    /// One of the child's stdio pipes was not created.
    #[error("child {stream} pipe was not created")]
    Pipe {
        /// Which stream is missing ("stdin", "stdout", "stderr").
        stream: &'static str,
    },

    /// Spawning the child process failed.
    #[error("failed to start executable {path}: {source}")]
    Spawn {
        /// The executable that failed to start.
        path: String,
        /// Underlying spawn error.
        source: io::Error,
    },
}

impl HostError {
    /// Returns the errno-equivalent code reported to the service manager.
    ///
    /// # Example
    /// ```
    /// use procmux::HostError;
    ///
    /// let err = HostError::ExecMissing { path: "/bin/nope".into() };
    /// assert_eq!(err.errno(), libc::ENOENT);
    /// ```
    pub fn errno(&self) -> c_int {
        match self {
            HostError::InvalidExec { .. } | HostError::InvalidListen { .. } => libc::EINVAL,
            HostError::ExecDirMissing { .. }
            | HostError::ExecMissing { .. }
            | HostError::SocketDirMissing { .. } => libc::ENOENT,
            HostError::ExecDirNotDir { .. } | HostError::SocketDirNotDir { .. } => libc::ENOTDIR,
            HostError::SocketExists { .. } => libc::EEXIST,
            HostError::Bind { .. } => libc::EPERM,
            HostError::Pipe { .. } => libc::EPIPE,
            HostError::Spawn { .. } => libc::ENOEXEC,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            HostError::InvalidExec { .. } => "invalid_exec",
            HostError::ExecDirMissing { .. } => "exec_dir_missing",
            HostError::ExecDirNotDir { .. } => "exec_dir_not_dir",
            HostError::ExecMissing { .. } => "exec_missing",
            HostError::InvalidListen { .. } => "invalid_listen",
            HostError::SocketDirMissing { .. } => "socket_dir_missing",
            HostError::SocketDirNotDir { .. } => "socket_dir_not_dir",
            HostError::SocketExists { .. } => "socket_exists",
            HostError::Bind { .. } => "bind_failed",
            HostError::Pipe { .. } => "pipe_missing",
            HostError::Spawn { .. } => "spawn_failed",
        }
    }
}

/// # Errors produced by the notification client.
///
/// An absent `NOTIFY_SOCKET` is deliberately **not** represented here: no
/// manager being configured is a normal standalone-run condition and the
/// helpers report it as `Ok(false)` instead. Only a present-but-malformed
/// address, an invalid message, or a failed send is an error, and even then
/// liveness reporting stays best-effort: callers log and move on.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum NotifyError {
    /// `NOTIFY_SOCKET` is set but is not an abstract (`@`) or filesystem
    /// (`/`) unix address.
    #[error("invalid NOTIFY_SOCKET address: {socket:?}")]
    InvalidSocket {
        /// The rejected address value.
        socket: String,
    },

    /// Status text contained a line terminator; the protocol is one message
    /// per line, so nothing was sent.
    #[error("status text must be a single line")]
    InvalidStatus,

    /// `WATCHDOG_USEC` or `WATCHDOG_PID` did not parse as an integer.
    #[error("invalid watchdog environment value: {value:?}")]
    InvalidWatchdog {
        /// The unparsable value.
        value: String,
    },

    /// Creating the datagram socket or sending the message failed.
    #[error("notification send failed: {0}")]
    Send(#[from] io::Error),
}
