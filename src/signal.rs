//! Termination signal handling
//!
//! SIGTERM (systemd stop), SIGINT (Ctrl+C) and SIGHUP are blocked on the
//! main thread before any other thread exists, so every thread inherits the
//! mask. They are then received through a signalfd by a watcher thread that
//! raises the daemon's shutdown flag. No blocking call depends on EINTR.

use anyhow::{Context, Result};
use log::{info, warn};
use nix::sys::signal::{SigSet, Signal};
use nix::sys::signalfd::{SfdFlags, SignalFd};

use crate::state::Daemon;

const TERMINATION_SIGNALS: [Signal; 3] = [Signal::SIGTERM, Signal::SIGINT, Signal::SIGHUP];

fn termination_set() -> SigSet {
    let mut set = SigSet::empty();
    for sig in TERMINATION_SIGNALS {
        set.add(sig);
    }
    set
}

/// Block termination signals on the calling thread
///
/// Call on the main thread before spawning anything.
pub fn block_termination_signals() -> Result<()> {
    termination_set()
        .thread_block()
        .context("Failed to block termination signals")
}

/// Non-blocking reader for pending termination signals
pub struct SignalWatch {
    signal_fd: SignalFd,
}

impl SignalWatch {
    pub fn new() -> Result<Self> {
        let signal_fd = SignalFd::with_flags(
            &termination_set(),
            SfdFlags::SFD_NONBLOCK | SfdFlags::SFD_CLOEXEC,
        )
        .context("Failed to create signalfd")?;
        Ok(Self { signal_fd })
    }

    /// Take one pending termination signal, if any
    pub fn poll(&mut self) -> Option<Signal> {
        match self.signal_fd.read_signal() {
            Ok(Some(siginfo)) => Signal::try_from(siginfo.ssi_signo as i32).ok(),
            Ok(None) => None,
            Err(e) => {
                warn!("signalfd read error: {}", e);
                None
            }
        }
    }
}

/// Signal watcher thread body
///
/// Checks the signalfd once per monitor tick and exits once shutdown is
/// requested from any source.
pub fn run(daemon: &Daemon, mut watch: SignalWatch) {
    let tick = daemon.config().monitor.tick();
    loop {
        if let Some(sig) = watch.poll() {
            info!("Received {}, shutting down", sig);
            daemon.request_shutdown();
            break;
        }
        if !daemon.shutdown().wait(tick) {
            break;
        }
    }
}
