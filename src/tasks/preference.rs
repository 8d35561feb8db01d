//! Angle-detection preference watcher
//!
//! The settings UI persists a single '0'/'1' character. It is polled rather
//! than watched; a missing or unreadable file keeps the last known value.

use anyhow::{bail, Context, Result};
use log::{debug, info};
use std::path::Path;

use crate::state::Daemon;

/// Parse the persisted toggle
pub fn read_preference(path: &Path) -> Result<bool> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    match content.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        other => bail!("Unrecognized value {:?} in {}", other, path.display()),
    }
}

/// Reload the toggle into the daemon; returns false if the read failed
pub fn reload(daemon: &Daemon) -> bool {
    let path = Path::new(&daemon.config().angle.preference_path);
    match read_preference(path) {
        Ok(enabled) => {
            if enabled != daemon.angle_detection_enabled() {
                info!(
                    "Angle detection {}",
                    if enabled { "enabled" } else { "disabled" }
                );
            }
            daemon.set_angle_detection(enabled);
            true
        }
        Err(e) => {
            debug!("Keeping angle detection preference: {:#}", e);
            false
        }
    }
}

/// Preference watcher thread body
pub fn run(daemon: &Daemon) {
    let interval = daemon.config().angle.reload_interval();
    info!("Preference watcher thread started");

    while daemon.shutdown().wait(interval) {
        reload(daemon);
    }

    info!("Preference watcher thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_config, TestRig};
    use std::fs;

    fn rig_with_pref(dir: &tempfile::TempDir) -> (TestRig, std::path::PathBuf) {
        let path = dir.path().join("angle_detection");
        let mut cfg = test_config();
        cfg.angle.preference_path = path.to_string_lossy().into_owned();
        (TestRig::with_config(cfg, true), path)
    }

    #[test]
    fn test_parse_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pref");
        fs::write(&path, "1\n").unwrap();
        assert!(read_preference(&path).unwrap());
        fs::write(&path, "0").unwrap();
        assert!(!read_preference(&path).unwrap());
        fs::write(&path, "yes").unwrap();
        assert!(read_preference(&path).is_err());
    }

    #[test]
    fn test_missing_file_keeps_value() {
        let dir = tempfile::tempdir().unwrap();
        let (rig, path) = rig_with_pref(&dir);

        fs::write(&path, "1").unwrap();
        assert!(reload(&rig.daemon));
        assert!(rig.daemon.angle_detection_enabled());

        fs::remove_file(&path).unwrap();
        assert!(!reload(&rig.daemon));
        assert!(rig.daemon.angle_detection_enabled());
    }

    #[test]
    fn test_absent_defaults_off() {
        let dir = tempfile::tempdir().unwrap();
        let (rig, _path) = rig_with_pref(&dir);
        assert!(!reload(&rig.daemon));
        assert!(!rig.daemon.angle_detection_enabled());
    }
}
