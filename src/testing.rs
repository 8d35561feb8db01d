//! Test doubles for the control channel and presence check

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::device::{Channel, ChannelOpener, FrameSource, PresenceCheck};
use crate::state::Daemon;

#[derive(Default)]
struct Recording {
    frames: Vec<Vec<u8>>,
    short: bool,
    error: Option<ErrorKind>,
}

/// Outbound half that records every complete write
#[derive(Clone, Default)]
pub struct RecordingWriter {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.inner.lock().frames.clone()
    }

    /// Accept only one byte per write
    pub fn set_short(&self, short: bool) {
        self.inner.lock().short = short;
    }

    /// Fail every write with `kind`
    pub fn set_error(&self, kind: Option<ErrorKind>) {
        self.inner.lock().error = kind;
    }
}

impl Write for RecordingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.inner.lock();
        if let Some(kind) = inner.error {
            return Err(io::Error::from(kind));
        }
        if inner.short && buf.len() > 1 {
            return Ok(1);
        }
        inner.frames.push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Presence check toggled by the test
#[derive(Clone)]
pub struct FakePresence(Arc<AtomicBool>);

impl PresenceCheck for FakePresence {
    fn is_present(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Inbound half replaying a script, then failing like a vanished device
pub struct ScriptedReader {
    script: VecDeque<io::Result<Vec<u8>>>,
}

impl ScriptedReader {
    pub fn new(script: Vec<io::Result<Vec<u8>>>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl FrameSource for ScriptedReader {}

impl Read for ScriptedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.script.pop_front() {
            Some(Ok(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Some(Err(e)) => Err(e),
            None => Err(io::Error::from(ErrorKind::BrokenPipe)),
        }
    }
}

/// Opener serving queued outcomes; fails with NotFound once drained
///
/// Every channel it hands out shares one recording writer.
#[derive(Default)]
pub struct FakeOpener {
    queue: Mutex<VecDeque<io::Result<Channel>>>,
    opens: AtomicU32,
    writer: RecordingWriter,
}

impl FakeOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_failure(&self) {
        self.queue
            .lock()
            .push_back(Err(io::Error::from(ErrorKind::NotFound)));
    }

    /// Queue a channel whose reader replays `script`
    pub fn push_channel(&self, script: Vec<io::Result<Vec<u8>>>) {
        let channel = Channel {
            reader: Box::new(ScriptedReader::new(script)),
            writer: Box::new(self.writer.clone()),
        };
        self.queue.lock().push_back(Ok(channel));
    }

    pub fn opens(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn writer(&self) -> RecordingWriter {
        self.writer.clone()
    }
}

impl ChannelOpener for FakeOpener {
    fn open(&self) -> io::Result<Channel> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(io::Error::from(ErrorKind::NotFound)))
    }

    fn describe(&self) -> String {
        "fake-nanodev".to_string()
    }
}

/// Defaults with zero reconnect backoff
pub fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.reconnect.base_delay_ms = 0;
    cfg.reconnect.max_delay_ms = 0;
    cfg
}

/// A daemon wired to fakes
pub struct TestRig {
    pub daemon: Daemon,
    /// Outbound half installed at startup
    pub writer: RecordingWriter,
    /// Serves reopens (unlock, reconnect)
    pub opener: Arc<FakeOpener>,
    presence: FakePresence,
}

impl TestRig {
    pub fn with_config(config: Config, present: bool) -> Self {
        let presence = FakePresence(Arc::new(AtomicBool::new(present)));
        let opener = Arc::new(FakeOpener::new());
        let daemon = Daemon::new(config, Box::new(presence.clone()), opener.clone());
        let writer = RecordingWriter::new();
        daemon.keyboard().install_writer(Box::new(writer.clone()));
        Self {
            daemon,
            writer,
            opener,
            presence,
        }
    }

    /// Keyboard starts disabled
    pub fn new(present: bool) -> Self {
        let rig = Self::with_config(test_config(), present);
        rig.daemon.keyboard().set_enabled(false, true);
        rig
    }

    /// Keyboard starts enabled
    pub fn enabled(present: bool) -> Self {
        let rig = Self::with_config(test_config(), present);
        rig.daemon.keyboard().set_enabled(true, true);
        rig
    }

    /// Frames written on the startup handle
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.writer.frames()
    }

    pub fn set_present(&self, present: bool) {
        self.presence.0.store(present, Ordering::SeqCst);
    }
}
