//! Keyboard connection monitor
//!
//! Samples presence of the keyboard's input node every tick and commits a
//! change only after it has been seen on `debounce_count` consecutive
//! samples, so a connector bouncing during attach does not toggle the
//! controller.

use log::{debug, info};
use std::time::Instant;

use crate::state::Daemon;

/// Consecutive-sample debouncer
#[derive(Debug)]
pub struct Debouncer {
    committed: bool,
    count: u32,
    threshold: u32,
}

impl Debouncer {
    pub fn new(initial: bool, threshold: u32) -> Self {
        Self {
            committed: initial,
            count: 0,
            threshold: threshold.max(1),
        }
    }

    #[cfg(test)]
    pub fn committed(&self) -> bool {
        self.committed
    }

    /// Feed one sample; returns the new value when a change is committed
    pub fn sample(&mut self, present: bool) -> Option<bool> {
        if present == self.committed {
            self.count = 0;
            return None;
        }

        self.count += 1;
        debug!(
            "Potential keyboard connection change detected ({}/{})",
            self.count, self.threshold
        );
        if self.count < self.threshold {
            return None;
        }

        self.committed = present;
        self.count = 0;
        Some(present)
    }
}

/// One monitor step
pub fn tick(daemon: &Daemon, debouncer: &mut Debouncer, now: Instant) {
    let present = daemon.keyboard_present();
    let change = debouncer.sample(present);

    let mut kb = daemon.keyboard();
    if kb.paused {
        if change.is_some() {
            debug!("Connection change committed while paused, not acting on it");
        }
        return;
    }
    kb.last_activity = now;

    match change {
        Some(connected) => {
            if connected {
                info!("Keyboard connected");
            } else {
                info!("Keyboard disconnected - disabling");
            }
            let target = connected && !kb.locked;
            kb.set_enabled(target, false);
        }
        None => kb.retry_pending(),
    }
}

/// Monitor thread body
pub fn run(daemon: &Daemon) {
    let interval = daemon.config().monitor.tick();
    let mut debouncer = Debouncer::new(
        daemon.keyboard_present(),
        daemon.config().monitor.debounce_count,
    );
    info!("Keyboard monitor thread started");

    while !daemon.shutdown().is_requested() {
        drop(daemon.wait_while_paused(interval));
        if daemon.shutdown().is_requested() {
            break;
        }

        tick(daemon, &mut debouncer, Instant::now());

        if !daemon.shutdown().wait(interval) {
            break;
        }
    }

    info!("Keyboard monitor thread exiting");
}
