//! Control channel to the keyboard controller
//!
//! The controller is a character device opened read-write. The foreground
//! thread blocks in `read` on one descriptor while other threads send state
//! commands on a duplicate, so a channel is handed out as two halves.

use nix::unistd::{access, AccessFlags};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::PathBuf;

/// Readable end of a channel
pub trait FrameSource: Read + Send {
    /// Descriptor to wait on before reading (None = read directly)
    fn poll_fd(&self) -> Option<RawFd> {
        None
    }
}

impl FrameSource for File {
    fn poll_fd(&self) -> Option<RawFd> {
        Some(self.as_raw_fd())
    }
}

/// Placeholder while the channel is down
impl FrameSource for io::Empty {}

/// Inbound half (owned by the read loop)
pub type FrameReader = Box<dyn FrameSource>;

/// Outbound half (owned by the state coordinator)
pub type FrameWriter = Box<dyn Write + Send>;

/// An open control channel
pub struct Channel {
    pub reader: FrameReader,
    pub writer: FrameWriter,
}

/// Opens the control channel; shared by the read loop, the reconnection
/// supervisor and the unlock handler
pub trait ChannelOpener: Send + Sync {
    fn open(&self) -> io::Result<Channel>;

    /// Human-readable endpoint for logs
    fn describe(&self) -> String;

    /// Advisory writability check (logging only)
    fn writable(&self) -> bool {
        true
    }
}

/// Character device endpoint
pub struct DeviceOpener {
    path: PathBuf,
}

impl DeviceOpener {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ChannelOpener for DeviceOpener {
    fn open(&self) -> io::Result<Channel> {
        let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        let writer = file.try_clone()?;
        Ok(Channel {
            reader: Box::new(file),
            writer: Box::new(writer),
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn writable(&self) -> bool {
        access(self.path.as_path(), AccessFlags::W_OK).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device() {
        let opener = DeviceOpener::new("/nonexistent/nanodev0");
        let err = opener.open().err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!opener.writable());
    }

    #[test]
    fn test_device_reader_is_pollable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nanodev0");
        std::fs::write(&path, b"").unwrap();
        let ch = DeviceOpener::new(&path).open().unwrap();
        assert!(ch.reader.poll_fd().is_some());
        assert!(io::empty().poll_fd().is_none());
    }

    #[test]
    fn test_halves_share_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nanodev0");
        std::fs::write(&path, b"").unwrap();

        let opener = DeviceOpener::new(&path);
        let mut ch = opener.open().unwrap();
        ch.writer.write_all(&[0x32, 0xFF, 1]).unwrap();
        ch.writer.flush().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![0x32, 0xFF, 1]);
        assert!(opener.writable());
    }
}
