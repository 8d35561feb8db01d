//! Keyboard state coordinator
//!
//! `KeyboardState` is the only writer of the enabled flag and the only
//! sender on the outbound half of the control channel. It lives behind the
//! coordination lock in [`super::Daemon`], so holding the guard is what
//! serializes transitions across threads.

use log::{debug, error, info, warn};
use std::io::ErrorKind;
use std::time::Instant;

use crate::device::FrameWriter;
use crate::protocol::{encode_state, STATE_FRAME_LEN};

/// State guarded by the coordination lock
pub struct KeyboardState {
    /// Key-scan circuitry enabled (last requested state)
    enabled: bool,
    /// Screen locked
    pub locked: bool,
    /// Connection monitor paused (system asleep)
    pub paused: bool,
    /// Last time the connection monitor completed a tick
    pub last_activity: Instant,
    /// Outbound half of the control channel (None = invalidated)
    writer: Option<FrameWriter>,
    /// Last hardware write failed; resend on the next opportunity
    pending_sync: bool,
}

impl KeyboardState {
    pub fn new(now: Instant) -> Self {
        Self {
            enabled: false,
            locked: false,
            paused: false,
            last_activity: now,
            writer: None,
            pending_sync: false,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[cfg(test)]
    pub fn pending_sync(&self) -> bool {
        self.pending_sync
    }

    pub fn has_writer(&self) -> bool {
        self.writer.is_some()
    }

    /// Install a freshly opened outbound handle
    ///
    /// The controller may have reset while the channel was down, so the
    /// current state is marked for resend.
    pub fn install_writer(&mut self, writer: FrameWriter) {
        self.writer = Some(writer);
        self.pending_sync = true;
    }

    /// Drop the outbound handle (channel closed or failed)
    pub fn invalidate_writer(&mut self) {
        if self.writer.take().is_some() {
            debug!("Control channel write handle invalidated");
        }
    }

    /// Request a keyboard state
    ///
    /// Writes only when `value` differs from the current state or `force`
    /// is set. Enabling while locked is refused.
    pub fn set_enabled(&mut self, value: bool, force: bool) {
        if value && self.locked {
            debug!("Not enabling keyboard because device is locked");
            return;
        }
        if self.enabled == value && !force {
            return;
        }

        self.enabled = value;
        info!("Setting keyboard state to: {}", value as u8);
        self.write_state();
    }

    /// Resend the current state if the previous write failed
    pub fn retry_pending(&mut self) {
        if self.pending_sync && self.writer.is_some() {
            debug!("Retrying keyboard state write");
            self.write_state();
        }
    }

    fn write_state(&mut self) {
        let frame = encode_state(self.enabled);
        let Some(writer) = self.writer.as_mut() else {
            error!(
                "Control channel not open; keyboard state {} not sent",
                self.enabled as u8
            );
            self.pending_sync = true;
            return;
        };

        match writer.write(&frame) {
            Ok(n) if n == STATE_FRAME_LEN => {
                if let Err(e) = writer.flush() {
                    warn!("Failed to flush keyboard state: {}", e);
                }
                self.pending_sync = false;
            }
            Ok(n) => {
                error!(
                    "Failed to write keyboard state: wrote {} of {} bytes",
                    n, STATE_FRAME_LEN
                );
                self.pending_sync = true;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {
                warn!("Keyboard state write interrupted");
                self.pending_sync = true;
            }
            // The handle stays: only the read loop decides the channel is gone
            Err(e) => {
                error!("Failed to write keyboard state: {}", e);
                self.pending_sync = true;
            }
        }
    }
}
