//! Monitor liveness watchdog
//!
//! Only nudges the monitor's wait condition; a stuck monitor thread is not
//! restarted.

use log::{info, warn};
use std::time::{Duration, Instant};

use crate::state::Daemon;

/// One watchdog check; returns true if the monitor was nudged
pub fn check(daemon: &Daemon, now: Instant, stall_limit: Duration) -> bool {
    let kb = daemon.keyboard();
    if kb.paused {
        return false;
    }

    let idle = now.saturating_duration_since(kb.last_activity);
    if idle <= stall_limit {
        return false;
    }

    warn!(
        "Watchdog: monitor thread appears stuck for {} seconds",
        idle.as_secs()
    );
    daemon.notify_monitor(&kb);
    true
}

/// Watchdog thread body
pub fn run(daemon: &Daemon) {
    let cfg = &daemon.config().watchdog;
    let interval = cfg.interval();
    let stall_limit = cfg.stall_limit();
    info!("Watchdog thread started");

    while daemon.shutdown().wait(interval) {
        check(daemon, Instant::now(), stall_limit);
    }

    info!("Watchdog thread exiting");
}
