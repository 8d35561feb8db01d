//! Configuration file management
//!
//! Loads TOML configuration files and provides daemon settings.
//! Default config path: /etc/peripherald/config.toml

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;

/// Daemon settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device node settings
    pub device: DeviceConfig,
    /// Connection monitor settings
    pub monitor: MonitorConfig,
    /// Watchdog settings
    pub watchdog: WatchdogConfig,
    /// Control channel reconnection settings
    pub reconnect: ReconnectConfig,
    /// Folding angle detection settings
    pub angle: AngleConfig,
}

/// Device node settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Keyboard controller character device
    pub control_path: String,
    /// Directory holding evdev nodes (event*)
    pub input_dir: String,
    /// sysfs input class directory (device names live under <node>/device/name)
    pub sysfs_input_dir: String,
    /// Node assumed when no name matches
    pub fallback_event_path: String,
    /// Case-insensitive substrings identifying the keyboard
    pub name_keywords: Vec<String>,
}

/// Connection monitor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Presence sampling interval in milliseconds (default: 200)
    pub tick_ms: u64,
    /// Consistent samples required to commit a change (default: 3)
    pub debounce_count: u32,
}

/// Watchdog settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Run the watchdog thread
    pub enabled: bool,
    /// Check interval in seconds (default: 10)
    pub interval_secs: u64,
    /// Monitor inactivity that counts as stalled, in seconds (default: 30)
    pub stall_secs: u64,
}

/// Control channel reconnection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Failed open attempts allowed over the process lifetime (default: 5)
    pub max_attempts: u32,
    /// First backoff step in milliseconds (default: 1000)
    pub base_delay_ms: u64,
    /// Backoff ceiling in milliseconds (default: 4000)
    pub max_delay_ms: u64,
}

/// Folding angle detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AngleConfig {
    /// Persisted toggle file written by the settings UI ('0' or '1')
    pub preference_path: String,
    /// Toggle reload interval in seconds (default: 10)
    pub reload_secs: u64,
    /// Angle in degrees at or beyond which the keyboard is disabled
    pub disable_angle: f32,
    /// Squared unit-vector delta that triggers a recompute
    pub delta_threshold: f32,
    /// IIO root scanned for the body accelerometer
    pub iio_dir: String,
    /// Explicit IIO device directory (empty = autodetect)
    pub accel_dir: String,
    /// Body accelerometer sampling interval in milliseconds
    pub poll_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            control_path: CONTROL_DEVICE_PATH.to_string(),
            input_dir: INPUT_DEV_DIR.to_string(),
            sysfs_input_dir: SYSFS_INPUT_DIR.to_string(),
            fallback_event_path: FALLBACK_EVENT_PATH.to_string(),
            name_keywords: vec![
                "xiaomi".to_string(),
                "keyboard".to_string(),
                "pipa".to_string(),
                "xkbd".to_string(),
            ],
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_ms: MONITOR_TICK_MS,
            debounce_count: DEBOUNCE_COUNT,
        }
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: WATCHDOG_INTERVAL_SECS,
            stall_secs: WATCHDOG_STALL_SECS,
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: RECONNECT_MAX_ATTEMPTS,
            base_delay_ms: RECONNECT_BASE_DELAY_MS,
            max_delay_ms: RECONNECT_MAX_DELAY_MS,
        }
    }
}

impl Default for AngleConfig {
    fn default() -> Self {
        Self {
            preference_path: PREFERENCE_PATH.to_string(),
            reload_secs: PREFERENCE_INTERVAL_SECS,
            disable_angle: FOLD_DISABLE_ANGLE_DEG,
            delta_threshold: FUSION_DELTA_THRESHOLD,
            iio_dir: IIO_DEVICES_DIR.to_string(),
            accel_dir: String::new(),
            poll_ms: SENSOR_POLL_MS,
        }
    }
}

impl MonitorConfig {
    pub fn tick(&self) -> Duration {
        millis(self.tick_ms)
    }
}

impl WatchdogConfig {
    pub fn interval(&self) -> Duration {
        secs(self.interval_secs)
    }

    pub fn stall_limit(&self) -> Duration {
        Duration::from_secs(self.stall_secs.min(MAX_INTERVAL_SECS))
    }
}

impl ReconnectConfig {
    /// Backoff before retry number `attempt` (0-based) within one incident
    ///
    /// Doubles from `base_delay_ms` and saturates at `max_delay_ms`:
    /// 1s, 2s, 4s, 4s, 4s with the defaults.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let ms = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms)
            .min(MAX_INTERVAL_SECS * 1000);
        Duration::from_millis(ms)
    }
}

impl AngleConfig {
    pub fn reload_interval(&self) -> Duration {
        secs(self.reload_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        millis(self.poll_ms)
    }
}

/// Interval in milliseconds, kept within 1 ms and `MAX_INTERVAL_SECS`
fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms.clamp(1, MAX_INTERVAL_SECS * 1000))
}

/// Interval in seconds, kept within 1 s and `MAX_INTERVAL_SECS`
fn secs(secs: u64) -> Duration {
    Duration::from_secs(secs.clamp(1, MAX_INTERVAL_SECS))
}

impl Config {
    /// System-wide config path
    const SYSTEM_CONFIG_PATH: &'static str = "/etc/peripherald/config.toml";

    /// Get the path that would be used for loading config
    /// Returns None if using built-in defaults
    pub fn config_path() -> Option<PathBuf> {
        // 1. PERIPHERALD_CONFIG environment variable
        if let Ok(path) = std::env::var("PERIPHERALD_CONFIG") {
            let p = Path::new(&path);
            if p.exists() {
                return Some(p.to_path_buf());
            }
        }

        // 2. User config: ~/.config/peripherald/config.toml
        if let Some(config_path) = default_config_path() {
            if config_path.exists() {
                return Some(config_path);
            }
        }

        // 3. System config: /etc/peripherald/config.toml
        let system_config = Path::new(Self::SYSTEM_CONFIG_PATH);
        if system_config.exists() {
            return Some(system_config.to_path_buf());
        }

        None
    }

    /// Load configuration with priority:
    /// 1. `explicit` path (--config)
    /// 2. PERIPHERALD_CONFIG environment variable
    /// 3. ~/.config/peripherald/config.toml (user config)
    /// 4. /etc/peripherald/config.toml (system config)
    /// 5. Built-in defaults
    pub fn load(explicit: Option<&Path>) -> Self {
        let path = explicit.map(Path::to_path_buf).or_else(Self::config_path);
        if let Some(path) = path {
            match Self::load_from_file(&path) {
                Ok(config) => {
                    info!("Loaded config: {}", path.display());
                    return config;
                }
                Err(e) => {
                    warn!("Failed to load config {}: {:#}", path.display(), e);
                }
            }
        }
        info!("Using built-in default config");
        Self::default()
    }

    /// Load settings from specified path
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Write the commented default config to `path` (or the system path)
    pub fn write_default_config(path: Option<&Path>) -> Result<PathBuf> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(Self::SYSTEM_CONFIG_PATH));
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        std::fs::write(&path, default_config_template())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// Get default user config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("peripherald").join("config.toml"))
}

/// Commented config matching `Config::default()`
pub fn default_config_template() -> String {
    let d = Config::default();
    let keywords = d
        .device
        .name_keywords
        .iter()
        .map(|k| format!("\"{}\"", k))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"# peripherald configuration

[device]
# Keyboard controller character device
control_path = "{control}"
# evdev nodes scanned once at startup
input_dir = "{input}"
sysfs_input_dir = "{sysfs}"
# Used when no device name matches
fallback_event_path = "{fallback}"
# Case-insensitive device name substrings
name_keywords = [{keywords}]

[monitor]
tick_ms = {tick}
debounce_count = {debounce}

[watchdog]
enabled = {wd_enabled}
interval_secs = {wd_interval}
stall_secs = {wd_stall}

[reconnect]
# Failed opens allowed over the whole process lifetime
max_attempts = {attempts}
base_delay_ms = {base}
max_delay_ms = {max}

[angle]
# '1' enables folding detection, '0' disables it
preference_path = "{pref}"
reload_secs = {reload}
disable_angle = {angle:.1}
delta_threshold = {delta}
iio_dir = "{iio}"
# Leave empty to autodetect under iio_dir
accel_dir = ""
poll_ms = {poll}
"#,
        control = d.device.control_path,
        input = d.device.input_dir,
        sysfs = d.device.sysfs_input_dir,
        fallback = d.device.fallback_event_path,
        keywords = keywords,
        tick = d.monitor.tick_ms,
        debounce = d.monitor.debounce_count,
        wd_enabled = d.watchdog.enabled,
        wd_interval = d.watchdog.interval_secs,
        wd_stall = d.watchdog.stall_secs,
        attempts = d.reconnect.max_attempts,
        base = d.reconnect.base_delay_ms,
        max = d.reconnect.max_delay_ms,
        pref = d.angle.preference_path,
        reload = d.angle.reload_secs,
        angle = d.angle.disable_angle,
        delta = d.angle.delta_threshold,
        iio = d.angle.iio_dir,
        poll = d.angle.poll_ms,
    )
}
