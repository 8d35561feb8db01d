//! Foreground read loop
//!
//! Waits on the inbound half of the control channel and hands each read to
//! the dispatcher. The wait is bounded by the monitor tick so a shutdown
//! raised by the signal watcher is seen within one tick. A read failure
//! starts reconnection; the loop returns only on shutdown or once the
//! reconnect budget is spent.

use log::{debug, error, info, warn};
use std::io::{self, ErrorKind, Read};
use std::os::unix::io::RawFd;
use std::time::Duration;

use crate::constants::{EMPTY_READ_BACKOFF_MS, READ_BUFFER_SIZE};
use crate::device::{FrameReader, FrameSource, Reconnect, ReconnectSupervisor};
use crate::dispatch::dispatch;
use crate::state::Daemon;

/// Why the read loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Shutdown,
    ChannelLost,
}

/// Wait until `fd` is readable (or hung up); false on timeout
fn wait_readable(fd: RawFd, timeout: Duration) -> io::Result<bool> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let timeout_ms = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
    let ret = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(ret > 0)
}

pub fn run(
    daemon: &Daemon,
    reader: &mut FrameReader,
    supervisor: &mut ReconnectSupervisor,
) -> LoopExit {
    let tick = daemon.config().monitor.tick();
    let idle = Duration::from_millis(EMPTY_READ_BACKOFF_MS);
    let mut buf = [0u8; READ_BUFFER_SIZE];

    loop {
        if daemon.shutdown().is_requested() {
            info!("Read loop stopping on shutdown request");
            return LoopExit::Shutdown;
        }

        let ready = match reader.poll_fd() {
            Some(fd) => wait_readable(fd, tick),
            None => Ok(true),
        };
        let result = match ready {
            Ok(false) => continue,
            Ok(true) => reader.read(&mut buf),
            Err(e) => Err(e),
        };

        let err = match result {
            Ok(0) => {
                // Nothing pending; avoid spinning
                daemon.shutdown().wait(idle);
                continue;
            }
            Ok(n) => {
                dispatch(daemon, &buf[..n]);
                continue;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => e,
        };

        error!("Error reading from control device: {}", err);
        *reader = Box::new(io::empty());
        daemon.keyboard().invalidate_writer();

        match supervisor.reconnect(daemon.shutdown()) {
            Reconnect::Connected(channel) => {
                *reader = channel.reader;
                let mut kb = daemon.keyboard();
                kb.install_writer(channel.writer);
                kb.retry_pending();
                debug!("Control channel restored, state resent");
            }
            Reconnect::Exhausted => {
                warn!(
                    "Giving up on control device after {} failed attempts",
                    supervisor.failures()
                );
                return LoopExit::ChannelLost;
            }
            Reconnect::Aborted => return LoopExit::Shutdown,
        }
    }
}
