//! Global constants for peripherald
//!
//! Consolidates timing, path, and protocol defaults
//! to eliminate magic numbers throughout the codebase.

// ============================================================================
// Timing Constants
// ============================================================================

/// Connection monitor sampling interval in milliseconds
pub const MONITOR_TICK_MS: u64 = 200;

/// Consecutive consistent presence samples required before committing a change
pub const DEBOUNCE_COUNT: u32 = 3;

/// Watchdog check interval in seconds
pub const WATCHDOG_INTERVAL_SECS: u64 = 10;

/// Monitor inactivity after which the watchdog nudges it (seconds)
pub const WATCHDOG_STALL_SECS: u64 = 30;

/// Preference file reload interval in seconds
pub const PREFERENCE_INTERVAL_SECS: u64 = 10;

/// Body accelerometer sampling interval in milliseconds
pub const SENSOR_POLL_MS: u64 = 200;

/// Delay after a zero-length control channel read
pub const EMPTY_READ_BACKOFF_MS: u64 = 100;

/// Ceiling for every configured interval (one day)
pub const MAX_INTERVAL_SECS: u64 = 86_400;

// ============================================================================
// Reconnection
// ============================================================================

/// Failed open attempts allowed over the whole process lifetime
pub const RECONNECT_MAX_ATTEMPTS: u32 = 5;

/// First reconnection backoff step in milliseconds
pub const RECONNECT_BASE_DELAY_MS: u64 = 1000;

/// Backoff ceiling in milliseconds
pub const RECONNECT_MAX_DELAY_MS: u64 = 4000;

// ============================================================================
// Sensor Fusion
// ============================================================================

/// Folding angle (degrees) at or beyond which the keyboard is disabled
pub const FOLD_DISABLE_ANGLE_DEG: f32 = 120.0;

/// Squared delta between unit vectors that triggers a recompute
pub const FUSION_DELTA_THRESHOLD: f32 = 0.04;

// ============================================================================
// Default Paths
// ============================================================================

/// Keyboard controller character device
pub const CONTROL_DEVICE_PATH: &str = "/dev/nanodev0";

/// Directory holding evdev nodes
pub const INPUT_DEV_DIR: &str = "/dev/input";

/// sysfs class directory exposing input device names
pub const SYSFS_INPUT_DIR: &str = "/sys/class/input";

/// Keyboard node used when no device name matches
pub const FALLBACK_EVENT_PATH: &str = "/dev/input/event12";

/// IIO device root scanned for the tablet accelerometer
pub const IIO_DEVICES_DIR: &str = "/sys/bus/iio/devices";

/// Persisted angle-detection toggle ('0' or '1')
pub const PREFERENCE_PATH: &str = "/data/local/tmp/keyboard_angle_detection";

/// Control channel read buffer size
pub const READ_BUFFER_SIZE: usize = 1024;

// ============================================================================
// Exit Codes
// ============================================================================

/// Invalid command line (EX_USAGE)
pub const EXIT_USAGE: i32 = 64;

/// Monitor or signal watcher thread could not be created (EX_SOFTWARE)
pub const EXIT_THREAD_SPAWN: i32 = 70;

/// Control channel lost and the reconnection budget is spent (EX_IOERR)
pub const EXIT_CHANNEL_LOST: i32 = 74;
