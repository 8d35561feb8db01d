//! Tablet body accelerometer (Linux IIO)
//!
//! Reads `in_accel_{x,y,z}_raw` from sysfs and scales them with
//! `in_accel_scale` when the driver exposes one.

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use super::fusion::Vec3;
use crate::config::AngleConfig;
use crate::state::Daemon;

const AXES: [&str; 3] = ["x", "y", "z"];

pub struct Accelerometer {
    dir: PathBuf,
    scale: f32,
}

impl Accelerometer {
    /// Configured device, or the first IIO device exposing accel channels
    pub fn locate(cfg: &AngleConfig) -> Option<Self> {
        if !cfg.accel_dir.is_empty() {
            return match Self::open(Path::new(&cfg.accel_dir)) {
                Ok(accel) => Some(accel),
                Err(e) => {
                    warn!("Body accelerometer unavailable: {:#}", e);
                    None
                }
            };
        }

        let mut dirs: Vec<PathBuf> = std::fs::read_dir(&cfg.iio_dir)
            .map(|entries| entries.flatten().map(|e| e.path()).collect())
            .unwrap_or_default();
        dirs.sort();

        for dir in dirs {
            if let Ok(accel) = Self::open(&dir) {
                return Some(accel);
            }
        }
        info!("No body accelerometer found under {}", cfg.iio_dir);
        None
    }

    pub fn open(dir: &Path) -> Result<Self> {
        for axis in AXES {
            let path = dir.join(format!("in_accel_{}_raw", axis));
            if !path.exists() {
                return Err(anyhow!("{} missing", path.display()));
            }
        }
        let scale = match read_value(&dir.join("in_accel_scale")) {
            Ok(scale) => scale,
            Err(_) => 1.0,
        };
        info!("Body accelerometer: {} (scale {})", dir.display(), scale);
        Ok(Self {
            dir: dir.to_path_buf(),
            scale,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn read(&self) -> Result<Vec3> {
        let mut v = [0.0; 3];
        for (slot, axis) in v.iter_mut().zip(AXES) {
            let raw = read_value(&self.dir.join(format!("in_accel_{}_raw", axis)))?;
            *slot = raw * self.scale;
        }
        Ok(v)
    }
}

fn read_value(path: &Path) -> Result<f32> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    content
        .trim()
        .parse::<f32>()
        .with_context(|| format!("Invalid value in {}", path.display()))
}

/// Sensor poller thread body
pub fn run(daemon: &Daemon, accel: Accelerometer) {
    let interval = daemon.config().angle.poll_interval();
    info!("Sensor poller thread started");

    loop {
        if daemon.angle_detection_enabled() {
            sample(daemon, &accel);
        }
        if !daemon.shutdown().wait(interval) {
            break;
        }
    }

    info!("Sensor poller thread exiting");
}

/// Read the body vector and publish it under the sensor lock
pub fn sample(daemon: &Daemon, accel: &Accelerometer) {
    match accel.read() {
        Ok(v) => daemon.sensors().set_body(v),
        Err(e) => debug!("Body accelerometer read failed: {:#}", e),
    }
}
