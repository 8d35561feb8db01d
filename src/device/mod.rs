//! Device access
//!
//! - Keyboard input node discovery (sysfs name matching)
//! - Control channel to the keyboard controller (/dev/nanodev0)
//! - Reconnection with bounded backoff after channel failure

pub mod channel;
pub mod reconnect;
pub mod resolver;

pub use channel::{Channel, ChannelOpener, DeviceOpener, FrameReader, FrameSource, FrameWriter};
pub use reconnect::{Reconnect, ReconnectSupervisor};
pub use resolver::{find_keyboard_input_path, NodePresence, PresenceCheck};
