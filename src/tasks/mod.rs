//! Background threads
//!
//! - Signal watcher, connection monitor (required)
//! - Watchdog, preference watcher, sensor poller (optional)
//!
//! All run as scoped threads borrowing the daemon context and are joined
//! when the scope ends.

pub mod monitor;
pub mod preference;
pub mod watchdog;

use log::{info, warn};
use std::thread::{self, Scope};

use crate::error::DaemonError;
use crate::sensor::{poller, Accelerometer};
use crate::signal::{self, SignalWatch};
use crate::state::Daemon;

/// Start every background thread
///
/// Failing to create the signal watcher or the monitor is fatal; the others
/// are optional and the daemon continues without them.
pub fn spawn_all<'scope, 'env>(
    scope: &'scope Scope<'scope, 'env>,
    daemon: &'env Daemon,
    signals: SignalWatch,
    accel: Option<Accelerometer>,
) -> Result<(), DaemonError> {
    thread::Builder::new()
        .name("kbd-signal".to_string())
        .spawn_scoped(scope, move || signal::run(daemon, signals))
        .map_err(DaemonError::SignalSpawn)?;

    thread::Builder::new()
        .name("kbd-monitor".to_string())
        .spawn_scoped(scope, move || monitor::run(daemon))
        .map_err(DaemonError::MonitorSpawn)?;

    if daemon.config().watchdog.enabled {
        if let Err(e) = thread::Builder::new()
            .name("kbd-watchdog".to_string())
            .spawn_scoped(scope, move || watchdog::run(daemon))
        {
            warn!("Failed to create watchdog thread - continuing without watchdog: {}", e);
        }
    } else {
        info!("Watchdog disabled by config");
    }

    if let Err(e) = thread::Builder::new()
        .name("kbd-preference".to_string())
        .spawn_scoped(scope, move || preference::run(daemon))
    {
        warn!("Failed to create preference thread - angle toggle frozen: {}", e);
    }

    match accel {
        Some(accel) => {
            if let Err(e) = thread::Builder::new()
                .name("kbd-sensor".to_string())
                .spawn_scoped(scope, move || poller::run(daemon, accel))
            {
                warn!("Failed to create sensor thread - continuing without body sensor: {}", e);
            }
        }
        None => info!("Sensor poller not started (no body accelerometer)"),
    }

    Ok(())
}
