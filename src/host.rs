//! # Supervisor loop: child lifecycle and stdio wiring.
//!
//! [`Host::run`] owns the whole supervision sequence:
//!
//! 1. build the scrollback ring, the stdout/stderr broadcasts (terminal and
//!    scrollback sinks), and the fan-in seeded with our own stdin;
//! 2. bind and spawn the attach server, if an endpoint is configured,
//!    before the child exists;
//! 3. spawn the child with all three stdio streams piped;
//! 4. run three copy tasks: child stdout → broadcast, child stderr →
//!    broadcast, fan-in → child stdin;
//! 5. signal readiness, start the watchdog ticker;
//! 6. wait for the child, then tear down: cancel the ticker, close the
//!    child's stdin, unlink the attach socket.
//!
//! The child exiting, with any status, is not a supervisor failure; only
//! procmux's own operational errors produce a non-zero exit.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{self, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::attach::{AttachServer, ListenAddr, Listener};
use crate::config::HostConfig;
use crate::error::HostError;
use crate::io::{Broadcast, FanIn, FanInRead, NonBlockingReader, Scrollback};
use crate::systemd;

/// Read size of the stdout/stderr/stdin copy tasks.
const COPY_CHUNK: usize = 8 * 1024;

/// Queue depth of the scrollback sink.
const SCROLLBACK_DEPTH: usize = 64;

/// How long the stdin task idles after an empty fan-in pass. The aggregate
/// reader is live and never ends on its own, so an empty pass means "poll
/// again shortly", not "wait for an event".
const STDIN_IDLE: Duration = Duration::from_millis(20);

/// Supervises one child process to completion.
pub struct Host;

impl Host {
    /// Runs the configured child under supervision until it exits.
    ///
    /// Errors are fatal supervisor failures (bind, pipes, spawn); readiness
    /// is never signaled when one occurs. The child's own exit status is
    /// deliberately not reflected in the result.
    pub async fn run(cfg: &HostConfig) -> Result<(), HostError> {
        let scrollback = Arc::new(Scrollback::new(cfg.scrollback));
        let stdout_cast = Arc::new(Broadcast::new());
        let stderr_cast = Arc::new(Broadcast::new());
        let fan_in = Arc::new(FanIn::new());

        stdout_cast.add_writer(io::stdout()).await;
        stderr_cast.add_writer(io::stderr()).await;

        // The scrollback is one sink fed by both streams, like a terminal.
        let scroll_tx = scrollback_sink(&scrollback);
        stdout_cast.add_sender(scroll_tx.clone()).await;
        stderr_cast.add_sender(scroll_tx).await;

        fan_in
            .add_sources([NonBlockingReader::new(io::stdin())])
            .await;

        // Attach endpoint comes up before the child so no early output is
        // produced while clients cannot connect yet.
        let listen = match &cfg.listen {
            Some(addr) => Some(ListenAddr::parse(addr)?),
            None => None,
        };
        if let Some(addr) = &listen {
            let listener = Listener::bind(addr).await?;
            AttachServer::new(
                listener,
                Arc::clone(&scrollback),
                Arc::clone(&stdout_cast),
                Arc::clone(&stderr_cast),
                Arc::clone(&fan_in),
            )
            .spawn();
        }

        let mut child = spawn_child(cfg)?;
        let child_stdout = child.stdout.take().ok_or(HostError::Pipe { stream: "stdout" })?;
        let child_stderr = child.stderr.take().ok_or(HostError::Pipe { stream: "stderr" })?;
        let child_stdin = child.stdin.take().ok_or(HostError::Pipe { stream: "stdin" })?;

        tokio::spawn(pump_output(child_stdout, Arc::clone(&stdout_cast)));
        tokio::spawn(pump_output(child_stderr, Arc::clone(&stderr_cast)));
        let stdin_task = tokio::spawn(pump_input(Arc::clone(&fan_in), child_stdin));

        if let Err(err) = systemd::notify::ready() {
            log::warn!("readiness notification failed: {err}");
        }
        let ticker = CancellationToken::new();
        match systemd::spawn_ticker(ticker.child_token(), None) {
            Ok(true) => log::debug!("watchdog ticker started"),
            Ok(false) => {}
            Err(err) => log::warn!("watchdog setup failed: {err}"),
        }

        if let Err(err) = child.wait().await {
            log::warn!("waiting for child failed: {err}");
        }

        // Teardown: no ping after this point, and dropping the stdin half
        // is what finally ends the fan-in copy task.
        ticker.cancel();
        stdin_task.abort();
        if let Some(ListenAddr::Unix(path)) = &listen {
            let _ = std::fs::remove_file(path);
        }
        Ok(())
    }
}

fn spawn_child(cfg: &HostConfig) -> Result<Child, HostError> {
    Command::new(&cfg.exec)
        .args(&cfg.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| HostError::Spawn {
            path: cfg.exec.display().to_string(),
            source,
        })
}

/// Registers the scrollback as a sink and returns the shared sender.
fn scrollback_sink(scrollback: &Arc<Scrollback>) -> mpsc::Sender<Bytes> {
    let (tx, mut rx) = mpsc::channel::<Bytes>(SCROLLBACK_DEPTH);
    let ring = Arc::clone(scrollback);
    tokio::spawn(async move {
        while let Some(chunk) = rx.recv().await {
            ring.write(&chunk).await;
        }
    });
    tx
}

/// Copies one child output stream into its broadcast until EOF.
async fn pump_output<R>(mut stream: R, cast: Arc<Broadcast>)
where
    R: tokio::io::AsyncRead + Send + Unpin,
{
    let mut buf = vec![0u8; COPY_CHUNK];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => cast.write(Bytes::copy_from_slice(&buf[..n])).await,
        }
    }
}

/// Feeds the fan-in aggregate into the child's stdin.
///
/// Runs until teardown: the fan-in never reports a permanent end while our
/// own stdin remains a source, so the loop's real exit is the write failing
/// once the child's stdin pipe has closed. That failure is expected and
/// ends the task silently.
async fn pump_input(fan_in: Arc<FanIn>, mut stdin: ChildStdin) {
    let mut buf = vec![0u8; COPY_CHUNK];
    loop {
        match fan_in.read(&mut buf).await {
            FanInRead::Done => break,
            FanInRead::Data(0) => time::sleep(STDIN_IDLE).await,
            FanInRead::Data(n) => {
                if stdin.write_all(&buf[..n]).await.is_err() {
                    break;
                }
                let _ = stdin.flush().await;
            }
        }
    }
}
