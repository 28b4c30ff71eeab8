//! procmux binary: flag parsing, validation, and the supervisor run.
//!
//! ```text
//! procmux -f /usr/bin/app -l /run/app.sock -b 200 -- --port 8080
//! ```
//!
//! Fatal errors print one `procmux: <message>` line to stderr, mirror the
//! errno code to the service manager, and exit 1. The child's own exit
//! status never becomes procmux's.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use procmux::systemd;
use procmux::{Host, HostConfig, HostError};

#[derive(Parser, Debug)]
#[command(
    name = "procmux",
    about = "Supervise a process, mirror its stdio to attachable sockets",
    version
)]
struct Cli {
    /// Listen path/address for attach clients (unix path or host:port)
    #[arg(short = 'l', long = "listen")]
    listen: Option<String>,

    /// Absolute path of the executable to supervise
    #[arg(short = 'f', long = "file")]
    file: PathBuf,

    /// Number of output lines to keep for replay to attaching clients
    #[arg(short = 'b', long = "buffer", default_value_t = 0)]
    buffer: usize,

    /// Arguments passed to the child (everything after --)
    #[arg(last = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let cfg = HostConfig {
        exec: cli.file,
        listen: cli.listen,
        scrollback: cli.buffer,
        args: cli.args,
    };

    if let Err(err) = cfg.validate() {
        fail(&err);
    }
    if let Err(err) = Host::run(&cfg).await {
        fail(&err);
    }
}

/// Reports a fatal supervisor error and exits non-zero.
fn fail(err: &HostError) -> ! {
    eprintln!("procmux: {err}");
    if let Err(notify_err) = systemd::notify::errno(err.errno()) {
        log::warn!("errno notification failed: {notify_err}");
    }
    process::exit(1);
}
