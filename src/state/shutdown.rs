//! Process-wide termination flag
//!
//! Every loop polls this between bounded waits. `wait` doubles as the
//! interruptible sleep for background threads, so a shutdown request wakes
//! them immediately instead of after their full interval.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Default)]
pub struct Shutdown {
    requested: Mutex<bool>,
    cond: Condvar,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag and wake all sleepers
    pub fn request(&self) {
        let mut requested = self.requested.lock();
        *requested = true;
        self.cond.notify_all();
    }

    pub fn is_requested(&self) -> bool {
        *self.requested.lock()
    }

    /// Sleep for up to `timeout`
    ///
    /// Returns true if the full interval elapsed, false if shutdown
    /// was requested before or during the wait.
    pub fn wait(&self, timeout: Duration) -> bool {
        let mut requested = self.requested.lock();
        // Unrepresentable deadline: sleep until requested
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            while !*requested {
                self.cond.wait(&mut requested);
            }
            return false;
        };
        while !*requested {
            if self.cond.wait_until(&mut requested, deadline).timed_out() {
                break;
            }
        }
        !*requested
    }
}
