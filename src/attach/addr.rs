//! # Listen address parsing, validation, and binding.
//!
//! An attach address beginning with the path separator is a unix-domain
//! socket path; anything else is a TCP `host:port`. Filesystem checks for
//! unix sockets happen before the child is started so a misconfigured
//! endpoint fails fast as a configuration error.

use std::io;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, UnixListener};

use crate::error::HostError;

/// Read/write halves of an accepted connection, unified across transports.
pub(crate) type ConnReader = Box<dyn AsyncRead + Send + Unpin>;
pub(crate) type ConnWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// A parsed attach endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenAddr {
    /// Filesystem-path unix-domain socket.
    Unix(PathBuf),
    /// TCP `host:port`.
    Tcp(String),
}

impl ListenAddr {
    /// Parses an address string.
    ///
    /// Single-character strings are rejected outright: `/` alone is not a
    /// socket path and no `host:port` fits in one character.
    pub fn parse(addr: &str) -> Result<Self, HostError> {
        if addr.len() <= 1 {
            return Err(HostError::InvalidListen { addr: addr.into() });
        }
        if addr.starts_with('/') {
            Ok(ListenAddr::Unix(PathBuf::from(addr)))
        } else {
            Ok(ListenAddr::Tcp(addr.to_string()))
        }
    }

    /// Pre-bind filesystem checks for unix sockets.
    ///
    /// The socket's directory must exist and be a directory, and the socket
    /// path itself must not already exist; a leftover socket file means
    /// another supervisor (or a crashed one) owns the endpoint, which the
    /// operator has to resolve. TCP addresses have nothing to check.
    pub fn validate(&self) -> Result<(), HostError> {
        let ListenAddr::Unix(path) = self else {
            return Ok(());
        };

        let dir = path.parent().unwrap_or_else(|| Path::new("/"));
        match std::fs::metadata(dir) {
            Err(_) => {
                return Err(HostError::SocketDirMissing {
                    path: dir.display().to_string(),
                })
            }
            Ok(meta) if !meta.is_dir() => {
                return Err(HostError::SocketDirNotDir {
                    path: dir.display().to_string(),
                })
            }
            Ok(_) => {}
        }

        if path.exists() {
            return Err(HostError::SocketExists {
                path: path.display().to_string(),
            });
        }
        Ok(())
    }

    /// Human-readable form for error messages.
    pub fn display(&self) -> String {
        match self {
            ListenAddr::Unix(path) => path.display().to_string(),
            ListenAddr::Tcp(addr) => addr.clone(),
        }
    }
}

/// A bound attach listener.
pub enum Listener {
    /// Bound unix-domain listener.
    Unix(UnixListener),
    /// Bound TCP listener.
    Tcp(TcpListener),
}

impl Listener {
    /// Binds the endpoint. Failure here is fatal to the supervisor.
    pub async fn bind(addr: &ListenAddr) -> Result<Self, HostError> {
        let bound = match addr {
            ListenAddr::Unix(path) => UnixListener::bind(path).map(Listener::Unix),
            ListenAddr::Tcp(hostport) => {
                TcpListener::bind(hostport).await.map(Listener::Tcp)
            }
        };
        bound.map_err(|source| HostError::Bind {
            addr: addr.display(),
            source,
        })
    }

    /// Accepts one connection and splits it into owned halves.
    pub(crate) async fn accept(&self) -> io::Result<(ConnReader, ConnWriter)> {
        match self {
            Listener::Unix(listener) => {
                let (stream, _) = listener.accept().await?;
                let (rd, wr) = stream.into_split();
                Ok((Box::new(rd), Box::new(wr)))
            }
            Listener::Tcp(listener) => {
                let (stream, _) = listener.accept().await?;
                let (rd, wr) = stream.into_split();
                Ok((Box::new(rd), Box::new(wr)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_slash_is_unix() {
        assert_eq!(
            ListenAddr::parse("/run/app.sock").unwrap(),
            ListenAddr::Unix(PathBuf::from("/run/app.sock"))
        );
    }

    #[test]
    fn test_anything_else_is_tcp() {
        assert_eq!(
            ListenAddr::parse("127.0.0.1:9000").unwrap(),
            ListenAddr::Tcp("127.0.0.1:9000".into())
        );
    }

    #[test]
    fn test_degenerate_addresses_rejected() {
        assert!(ListenAddr::parse("").is_err());
        assert!(ListenAddr::parse("/").is_err());
        assert!(ListenAddr::parse("x").is_err());
    }

    #[test]
    fn test_validate_rejects_missing_dir_and_existing_socket() {
        let dir = tempfile::tempdir().unwrap();

        let missing = ListenAddr::Unix(dir.path().join("nope/app.sock"));
        assert!(matches!(
            missing.validate(),
            Err(HostError::SocketDirMissing { .. })
        ));

        let occupied_path = dir.path().join("app.sock");
        std::fs::write(&occupied_path, b"").unwrap();
        let occupied = ListenAddr::Unix(occupied_path);
        assert!(matches!(
            occupied.validate(),
            Err(HostError::SocketExists { .. })
        ));

        let fresh = ListenAddr::Unix(dir.path().join("fresh.sock"));
        assert!(fresh.validate().is_ok());
    }
}
