//! Control channel reconnection
//!
//! After a read failure the channel is reopened with exponential backoff.
//! The attempt budget is shared by every incident over the process
//! lifetime; once spent the daemon gives up so the service manager sees
//! the failure instead of a daemon spinning on a dead device.

use log::{error, info};
use std::sync::Arc;

use super::{Channel, ChannelOpener};
use crate::config::ReconnectConfig;
use crate::state::Shutdown;

/// Outcome of one reconnection incident
pub enum Reconnect {
    Connected(Channel),
    /// Lifetime budget spent
    Exhausted,
    /// Shutdown requested while retrying
    Aborted,
}

pub struct ReconnectSupervisor {
    opener: Arc<dyn ChannelOpener>,
    cfg: ReconnectConfig,
    /// Failed opens so far, across all incidents
    failures: u32,
}

impl ReconnectSupervisor {
    pub fn new(opener: Arc<dyn ChannelOpener>, cfg: ReconnectConfig) -> Self {
        Self {
            opener,
            cfg,
            failures: 0,
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn remaining(&self) -> u32 {
        self.cfg.max_attempts.saturating_sub(self.failures)
    }

    /// Reopen the channel, sleeping between failures on `shutdown`
    pub fn reconnect(&mut self, shutdown: &Shutdown) -> Reconnect {
        info!(
            "Starting device reconnection procedure ({} attempts left)",
            self.remaining()
        );

        let mut step = 0;
        while self.remaining() > 0 {
            if shutdown.is_requested() {
                info!("Reconnection aborted due to termination request");
                return Reconnect::Aborted;
            }

            info!(
                "Reconnect attempt {}/{}",
                self.failures + 1,
                self.cfg.max_attempts
            );
            match self.opener.open() {
                Ok(channel) => {
                    info!("Successfully reconnected to {}", self.opener.describe());
                    return Reconnect::Connected(channel);
                }
                Err(e) => {
                    self.failures += 1;
                    error!("Reconnection attempt failed: {}", e);
                }
            }

            if self.remaining() == 0 {
                break;
            }
            let delay = self.cfg.backoff(step);
            step += 1;
            info!("Waiting {:.1} seconds before next attempt", delay.as_secs_f32());
            if !shutdown.wait(delay) {
                info!("Reconnection aborted due to termination request");
                return Reconnect::Aborted;
            }
        }

        error!(
            "Failed to reconnect: {} attempts used",
            self.cfg.max_attempts
        );
        Reconnect::Exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_config, FakeOpener};

    fn supervisor(opener: &Arc<FakeOpener>) -> ReconnectSupervisor {
        ReconnectSupervisor::new(opener.clone(), test_config().reconnect)
    }

    #[test]
    fn test_gives_up_after_five_failures() {
        let opener = Arc::new(FakeOpener::new());
        let mut sup = supervisor(&opener);
        assert!(matches!(sup.reconnect(&Shutdown::new()), Reconnect::Exhausted));
        assert_eq!(opener.opens(), 5);
        assert_eq!(sup.remaining(), 0);
    }

    #[test]
    fn test_succeeds_on_third_attempt() {
        let opener = Arc::new(FakeOpener::new());
        opener.push_failure();
        opener.push_failure();
        opener.push_channel(Vec::new());
        let mut sup = supervisor(&opener);
        assert!(matches!(sup.reconnect(&Shutdown::new()), Reconnect::Connected(_)));
        assert_eq!(opener.opens(), 3);
        assert_eq!(sup.failures(), 2);
    }

    #[test]
    fn test_budget_spans_incidents() {
        let opener = Arc::new(FakeOpener::new());
        opener.push_failure();
        opener.push_failure();
        opener.push_channel(Vec::new());
        let mut sup = supervisor(&opener);
        assert!(matches!(sup.reconnect(&Shutdown::new()), Reconnect::Connected(_)));

        // Second incident only has three attempts left
        assert!(matches!(sup.reconnect(&Shutdown::new()), Reconnect::Exhausted));
        assert_eq!(opener.opens(), 6);
    }

    #[test]
    fn test_aborts_on_shutdown() {
        let opener = Arc::new(FakeOpener::new());
        let shutdown = Shutdown::new();
        shutdown.request();
        let mut sup = supervisor(&opener);
        assert!(matches!(sup.reconnect(&shutdown), Reconnect::Aborted));
        assert_eq!(opener.opens(), 0);
    }
}
