//! Keyboard folding detection
//!
//! - Fusion of tablet body and keyboard tray accelerometers
//! - IIO poller feeding the body vector

pub mod fusion;
pub mod poller;

pub use fusion::FusionEngine;
pub use poller::Accelerometer;
