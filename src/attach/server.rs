//! # Accept loop that wires clients into the broadcast and fan-in sets.
//!
//! Per accepted connection, in order:
//! 1. replay the scrollback snapshot (non-empty lines, oldest first,
//!    best-effort: a client that hangs up mid-replay is dropped by the
//!    registrations that follow failing on their own);
//! 2. register the connection as a sink on **both** the stdout and stderr
//!    broadcasts, one shared queue so a single task writes the socket;
//! 3. wrap the read half in a [`NonBlockingReader`] and add it to the
//!    fan-in rotation.
//!
//! Accept errors are logged and the loop continues; one bad connection
//! never takes the listener down. The loop itself runs until the process
//! exits, there is no per-connection teardown API.

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::attach::addr::Listener;
use crate::io::{drain, Broadcast, FanIn, NonBlockingReader, Scrollback};

/// Queue depth for a connection's shared stdout+stderr sink.
const CONN_SINK_DEPTH: usize = 64;

/// Owns the bound listener and the shared structures each new client is
/// enrolled into.
pub struct AttachServer {
    listener: Listener,
    scrollback: Arc<Scrollback>,
    stdout: Arc<Broadcast>,
    stderr: Arc<Broadcast>,
    fan_in: Arc<FanIn>,
}

impl AttachServer {
    /// Creates a server around an already-bound listener.
    ///
    /// Binding stays with the caller: a bind failure is fatal to the whole
    /// supervisor and is reported before the child ever starts.
    pub fn new(
        listener: Listener,
        scrollback: Arc<Scrollback>,
        stdout: Arc<Broadcast>,
        stderr: Arc<Broadcast>,
        fan_in: Arc<FanIn>,
    ) -> Self {
        Self {
            listener,
            scrollback,
            stdout,
            stderr,
            fan_in,
        }
    }

    /// Spawns the accept loop. It runs for the lifetime of the process.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.accept_loop())
    }

    async fn accept_loop(self) {
        loop {
            let (conn_rd, mut conn_wr) = match self.listener.accept().await {
                Ok(halves) => halves,
                Err(err) => {
                    log::warn!("attach accept failed: {err}");
                    continue;
                }
            };

            // Replay history before any live output can reach the sink.
            for line in self.scrollback.snapshot().await {
                if line.is_empty() {
                    continue;
                }
                let _ = conn_wr.write_all(&line).await;
            }

            let (tx, rx) = mpsc::channel(CONN_SINK_DEPTH);
            self.stdout.add_sender(tx.clone()).await;
            self.stderr.add_sender(tx).await;
            tokio::spawn(drain(rx, conn_wr));

            self.fan_in
                .add_sources([NonBlockingReader::new(conn_rd)])
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attach::addr::ListenAddr;
    use crate::io::FanInRead;
    use bytes::Bytes;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::UnixStream;
    use tokio::time::timeout;

    struct Fixture {
        scrollback: Arc<Scrollback>,
        stdout: Arc<Broadcast>,
        fan_in: Arc<FanIn>,
    }

    async fn start_server(path: &std::path::Path) -> Fixture {
        let addr = ListenAddr::Unix(path.to_path_buf());
        let listener = Listener::bind(&addr).await.unwrap();
        let fixture = Fixture {
            scrollback: Arc::new(Scrollback::new(8)),
            stdout: Arc::new(Broadcast::new()),
            fan_in: Arc::new(FanIn::new()),
        };
        AttachServer::new(
            listener,
            Arc::clone(&fixture.scrollback),
            Arc::clone(&fixture.stdout),
            Arc::new(Broadcast::new()),
            Arc::clone(&fixture.fan_in),
        )
        .spawn();
        fixture
    }

    #[tokio::test]
    async fn test_attach_replays_history_then_streams_live_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attach.sock");
        let fixture = start_server(&path).await;

        fixture.scrollback.write(b"old-1\nold-2\n").await;

        let mut conn = UnixStream::connect(&path).await.unwrap();

        // Wait for enrollment, then produce live output.
        while fixture.stdout.sink_count().await == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        fixture.stdout.write(Bytes::from_static(b"live\n")).await;

        let mut seen = Vec::new();
        let expected = b"old-1\nold-2\nlive\n";
        timeout(Duration::from_secs(5), async {
            let mut buf = [0u8; 64];
            while seen.len() < expected.len() {
                let n = conn.read(&mut buf).await.unwrap();
                assert!(n > 0, "connection closed early");
                seen.extend_from_slice(&buf[..n]);
            }
        })
        .await
        .unwrap();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_client_input_reaches_the_fan_in() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attach.sock");
        let fixture = start_server(&path).await;

        let mut conn = UnixStream::connect(&path).await.unwrap();
        conn.write_all(b"typed\n").await.unwrap();

        let mut buf = [0u8; 16];
        let got = timeout(Duration::from_secs(5), async {
            loop {
                match fixture.fan_in.read(&mut buf).await {
                    FanInRead::Data(0) => {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                    }
                    FanInRead::Data(n) => break buf[..n].to_vec(),
                    FanInRead::Done => panic!("fan-in ended"),
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(got, b"typed\n");
    }
}
