//! Control channel wire format
//!
//! Frames exchanged with the keyboard controller over /dev/nanodev0.
//!
//! ```text
//! Outbound (3 bytes):   [0x32][0xFF][enabled]
//! Inbound (>= 7 bytes): [prefix][0x31][0x38][_][type][payload][...]
//! Movement (>= 12):     ... [x lo][x hi][y lo][y hi][z lo][z hi]
//! ```
//!
//! Decoding goes through named offsets in [`layout`] and returns a typed
//! [`Frame`] or a [`FrameError`]. Callers drop errors; they are never fatal.

use thiserror::Error;

/// Revision of the frame layout below
pub const SCHEMA_VERSION: u8 = 1;

/// Named byte offsets (schema v1)
pub mod layout {
    /// Sender-specific prefix, not validated
    pub const PREFIX: usize = 0;
    /// First header byte
    pub const HEADER_1: usize = 1;
    /// Second header byte
    pub const HEADER_2: usize = 2;
    /// Message type
    pub const KIND: usize = 4;
    /// Single payload byte (sleep/wake/lock/unlock)
    pub const PAYLOAD: usize = 5;
    /// Start of the three packed accelerometer axes
    pub const MOTION: usize = 6;
    /// Minimum inbound frame length
    pub const MIN_LEN: usize = 7;
    /// Minimum movement frame length (three 2-byte axes)
    pub const MOTION_LEN: usize = MOTION + 6;
}

/// Expected header bytes
pub const HEADER: [u8; 2] = [0x31, 0x38];

/// Outbound command opcode
pub const CMD_SET_KEYBOARD: u8 = 0x32;

/// Outbound command sub-opcode
pub const CMD_SET_KEYBOARD_ARG: u8 = 0xFF;

/// Length of an outbound state command
pub const STATE_FRAME_LEN: usize = 3;

/// Message type codes
pub const KIND_SLEEP: u8 = 37;
pub const KIND_WAKE: u8 = 40;
pub const KIND_LOCK: u8 = 41;
pub const KIND_UNLOCK: u8 = 42;
pub const KIND_MOVEMENT: u8 = 0x64;

/// Raw tray accelerometer reading (12-bit signed counts)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionSample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl MotionSample {
    pub fn to_vector(self) -> [f32; 3] {
        [self.x as f32, self.y as f32, self.z as f32]
    }
}

/// Decoded inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// System going to sleep (payload 1 = valid)
    Sleep { payload: u8 },
    /// System waking up (payload 1 = valid)
    Wake { payload: u8 },
    /// Screen locked
    Lock,
    /// Screen unlocked
    Unlock,
    /// Keyboard tray accelerometer update
    Movement(MotionSample),
}

/// Reasons an inbound buffer is not a usable frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame too short: {len} bytes (need {min})")]
    TooShort { len: usize, min: usize },
    #[error("invalid header: {0:02x},{1:02x}")]
    BadHeader(u8, u8),
    #[error("unknown message type {0} (0x{0:02x})")]
    UnknownKind(u8),
}

impl Frame {
    /// Decode an inbound buffer
    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() < layout::MIN_LEN {
            return Err(FrameError::TooShort {
                len: buf.len(),
                min: layout::MIN_LEN,
            });
        }

        let header = [buf[layout::HEADER_1], buf[layout::HEADER_2]];
        if header != HEADER {
            return Err(FrameError::BadHeader(header[0], header[1]));
        }

        let payload = buf[layout::PAYLOAD];
        match buf[layout::KIND] {
            KIND_SLEEP => Ok(Frame::Sleep { payload }),
            KIND_WAKE => Ok(Frame::Wake { payload }),
            KIND_LOCK => Ok(Frame::Lock),
            KIND_UNLOCK => Ok(Frame::Unlock),
            KIND_MOVEMENT => {
                if buf.len() < layout::MOTION_LEN {
                    return Err(FrameError::TooShort {
                        len: buf.len(),
                        min: layout::MOTION_LEN,
                    });
                }
                let m = &buf[layout::MOTION..layout::MOTION_LEN];
                Ok(Frame::Movement(MotionSample {
                    x: decode_axis(m[0], m[1]),
                    y: decode_axis(m[2], m[3]),
                    z: decode_axis(m[4], m[5]),
                }))
            }
            other => Err(FrameError::UnknownKind(other)),
        }
    }

    /// Prefix byte of a raw buffer (logging only)
    pub fn prefix(buf: &[u8]) -> Option<u8> {
        buf.get(layout::PREFIX).copied()
    }
}

/// Sign-extend the low 12 bits of a little-endian 16-bit word
fn decode_axis(lo: u8, hi: u8) -> i16 {
    let raw = u16::from_le_bytes([lo, hi]) & 0x0FFF;
    // Shift the 12-bit sign into bit 15, then arithmetic-shift back
    ((raw << 4) as i16) >> 4
}

/// Build the keyboard enable/disable command
pub fn encode_state(enabled: bool) -> [u8; STATE_FRAME_LEN] {
    [CMD_SET_KEYBOARD, CMD_SET_KEYBOARD_ARG, enabled as u8]
}

#[cfg(test)]
pub(crate) fn frame(kind: u8, payload: u8) -> Vec<u8> {
    vec![0x24, HEADER[0], HEADER[1], 0, kind, payload, 1]
}

#[cfg(test)]
pub(crate) fn movement_frame(x: i16, y: i16, z: i16) -> Vec<u8> {
    let mut buf = vec![0x24, HEADER[0], HEADER[1], 0, KIND_MOVEMENT, 1];
    for v in [x, y, z] {
        let word = (v as u16) & 0x0FFF;
        buf.extend_from_slice(&word.to_le_bytes());
    }
    buf
}
