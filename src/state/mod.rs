//! Shared daemon context
//!
//! One `Daemon` is created at startup and borrowed by every thread.
//! State is split across three lock domains that are never held together:
//! - coordination: keyboard/lock/pause state, activity timestamp, write handle
//! - sensor: accelerometer vectors and fusion state
//! - preference: angle-detection toggle

pub mod coordinator;
pub mod shutdown;

pub use coordinator::KeyboardState;
pub use shutdown::Shutdown;

use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::device::{ChannelOpener, PresenceCheck};
use crate::sensor::FusionEngine;

pub struct Daemon {
    config: Config,
    /// Coordination lock
    keyboard: Mutex<KeyboardState>,
    /// Signaled on wake, watchdog nudge and shutdown
    pause_cond: Condvar,
    /// Sensor lock
    sensors: Mutex<FusionEngine>,
    /// Preference lock
    angle_detection: RwLock<bool>,
    presence: Box<dyn PresenceCheck>,
    opener: Arc<dyn ChannelOpener>,
    shutdown: Shutdown,
}

impl Daemon {
    pub fn new(
        config: Config,
        presence: Box<dyn PresenceCheck>,
        opener: Arc<dyn ChannelOpener>,
    ) -> Self {
        let fusion = FusionEngine::new(config.angle.delta_threshold, config.angle.disable_angle);
        Self {
            config,
            keyboard: Mutex::new(KeyboardState::new(Instant::now())),
            pause_cond: Condvar::new(),
            sensors: Mutex::new(fusion),
            angle_detection: RwLock::new(false),
            presence,
            opener,
            shutdown: Shutdown::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Acquire the coordination lock
    pub fn keyboard(&self) -> MutexGuard<'_, KeyboardState> {
        self.keyboard.lock()
    }

    /// Acquire the sensor lock
    pub fn sensors(&self) -> MutexGuard<'_, FusionEngine> {
        self.sensors.lock()
    }

    pub fn angle_detection_enabled(&self) -> bool {
        *self.angle_detection.read()
    }

    pub fn set_angle_detection(&self, enabled: bool) {
        *self.angle_detection.write() = enabled;
    }

    /// Sample physical keyboard presence
    pub fn keyboard_present(&self) -> bool {
        self.presence.is_present()
    }

    pub fn opener(&self) -> &dyn ChannelOpener {
        self.opener.as_ref()
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Stop every loop and release a paused monitor
    pub fn request_shutdown(&self) {
        self.shutdown.request();
        let _guard = self.keyboard.lock();
        self.pause_cond.notify_all();
    }

    /// Wake the monitor; caller must hold the coordination lock
    pub fn notify_monitor(&self, _guard: &MutexGuard<'_, KeyboardState>) {
        self.pause_cond.notify_all();
    }

    /// Block the calling thread while the monitor is paused
    ///
    /// Re-checks every `poll` so a missed notification costs at most one
    /// interval. Returns the guard with `paused == false` unless shutdown
    /// was requested.
    pub fn wait_while_paused(&self, poll: Duration) -> MutexGuard<'_, KeyboardState> {
        let mut keyboard = self.keyboard.lock();
        while keyboard.paused && !self.shutdown.is_requested() {
            self.pause_cond.wait_for(&mut keyboard, poll);
        }
        keyboard
    }
}
