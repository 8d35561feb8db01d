//! Fatal daemon errors and their process exit codes

use std::io;
use thiserror::Error;

use crate::constants::{EXIT_CHANNEL_LOST, EXIT_THREAD_SPAWN, EXIT_USAGE};

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("{0} (see --help)")]
    Usage(String),

    #[error("Error opening control device {path}: {source}")]
    ChannelOpen {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create keyboard monitor thread: {0}")]
    MonitorSpawn(#[source] io::Error),

    #[error("Failed to create signal watcher thread: {0}")]
    SignalSpawn(#[source] io::Error),

    #[error("Could not recover control channel after {0} failed attempts")]
    ChannelLost(u32),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DaemonError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            DaemonError::Usage(_) => EXIT_USAGE,
            DaemonError::ChannelOpen { source, .. } => source.raw_os_error().unwrap_or(1),
            DaemonError::MonitorSpawn(_) | DaemonError::SignalSpawn(_) => EXIT_THREAD_SPAWN,
            DaemonError::ChannelLost(_) => EXIT_CHANNEL_LOST,
            DaemonError::Other(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let open = DaemonError::ChannelOpen {
            path: "/dev/nanodev0".to_string(),
            source: io::Error::from_raw_os_error(libc::ENOENT),
        };
        assert_eq!(open.exit_code(), libc::ENOENT);
        assert_eq!(
            DaemonError::MonitorSpawn(io::Error::from(io::ErrorKind::OutOfMemory)).exit_code(),
            70
        );
        assert_eq!(
            DaemonError::SignalSpawn(io::Error::from(io::ErrorKind::OutOfMemory)).exit_code(),
            70
        );
        assert_eq!(DaemonError::ChannelLost(5).exit_code(), 74);
        assert_ne!(
            DaemonError::MonitorSpawn(io::Error::from(io::ErrorKind::Other)).exit_code(),
            DaemonError::ChannelLost(5).exit_code()
        );
    }
}
