//! Inbound frame dispatch
//!
//! Runs on the read-loop thread, one frame at a time. That ordering is what
//! guarantees a lock's force-disable lands before a later unlock's
//! force-enable.

use log::{debug, info, trace, warn};
use std::time::Instant;

use crate::protocol::{Frame, MotionSample};
use crate::state::Daemon;

/// Decode `buf` and route it to its handler; bad frames are dropped
pub fn dispatch(daemon: &Daemon, buf: &[u8]) {
    let frame = match Frame::decode(buf) {
        Ok(frame) => frame,
        Err(e) => {
            debug!("Dropping message: {}", e);
            return;
        }
    };
    trace!(
        "Received message {:?} (prefix {:02x?})",
        frame,
        Frame::prefix(buf)
    );

    match frame {
        Frame::Sleep { payload: 1 } => on_sleep(daemon),
        Frame::Wake { payload: 1 } => on_wake(daemon),
        Frame::Sleep { payload } | Frame::Wake { payload } => {
            debug!("Ignoring power message with payload {}", payload);
        }
        Frame::Lock => on_lock(daemon),
        Frame::Unlock => on_unlock(daemon),
        Frame::Movement(sample) => on_movement(daemon, sample),
    }
}

fn on_sleep(daemon: &Daemon) {
    info!("Received sleep event - pausing keyboard monitoring");
    daemon.keyboard().paused = true;
}

fn on_wake(daemon: &Daemon) {
    info!("Received wake event - resuming keyboard monitoring");
    let present = daemon.keyboard_present();

    let mut kb = daemon.keyboard();
    kb.paused = false;
    kb.last_activity = Instant::now();
    daemon.notify_monitor(&kb);

    info!(
        "Wake: keyboard {}",
        if present { "connected" } else { "disconnected" }
    );
    // Re-assert: the recorded state may be stale after sleep
    let target = present && !kb.locked;
    kb.set_enabled(target, true);
}

fn on_lock(daemon: &Daemon) {
    info!("Device locked");
    if !daemon.opener().writable() {
        warn!(
            "Control device {} does not look writable; disabling anyway",
            daemon.opener().describe()
        );
    }

    let mut kb = daemon.keyboard();
    kb.locked = true;
    if kb.enabled() {
        kb.set_enabled(false, true);
    }
}

fn on_unlock(daemon: &Daemon) {
    info!("Device unlocked");
    let present = daemon.keyboard_present();

    let needs_reopen = {
        let mut kb = daemon.keyboard();
        kb.locked = false;
        present && !kb.has_writer()
    };

    // Open outside the coordination lock
    let reopened = if needs_reopen {
        info!("Control channel was invalidated, reopening once");
        match daemon.opener().open() {
            Ok(channel) => Some(channel.writer),
            Err(e) => {
                warn!("Reopen of {} failed: {}", daemon.opener().describe(), e);
                None
            }
        }
    } else {
        None
    };

    let mut kb = daemon.keyboard();
    if let Some(writer) = reopened {
        kb.install_writer(writer);
    }
    if present {
        kb.set_enabled(true, true);
    }
}

fn on_movement(daemon: &Daemon, sample: MotionSample) {
    if !daemon.angle_detection_enabled() {
        trace!("Angle detection disabled, ignoring movement");
        return;
    }

    let decision = {
        let mut sensors = daemon.sensors();
        let decision = sensors.update_tray(sample.to_vector());
        trace!(
            "Tray update #{}: body {:?} tray {:?}",
            sensors.tray_updates(),
            sensors.body(),
            sensors.tray()
        );
        decision
    };
    if let Some(decision) = decision {
        debug!(
            "Folding angle {:.1} deg, requesting {}",
            decision.angle,
            if decision.enable { "enable" } else { "disable" }
        );
        daemon.keyboard().set_enabled(decision.enable, false);
    }
}
