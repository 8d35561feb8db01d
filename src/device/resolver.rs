//! Keyboard input node discovery
//!
//! The keyboard's evdev index changes between boots, so /dev/input/event*
//! is scanned once at startup and each node's sysfs name is matched against
//! known identifiers. Never fails: with no match the configured fallback
//! path is used and presence checks simply report "absent".

use log::{debug, info, warn};
use nix::unistd::{access, AccessFlags};
use std::path::{Path, PathBuf};

use crate::config::DeviceConfig;

/// Resolved keyboard input node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardNode {
    /// /dev/input/eventN
    pub path: PathBuf,
    /// Reported device name (None when the fallback path is used)
    pub name: Option<String>,
}

/// Physical presence source for the connection monitor
pub trait PresenceCheck: Send + Sync {
    fn is_present(&self) -> bool;
}

/// Presence = the resolved input node exists
pub struct NodePresence {
    path: PathBuf,
}

impl NodePresence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PresenceCheck for NodePresence {
    fn is_present(&self) -> bool {
        access(self.path.as_path(), AccessFlags::F_OK).is_ok()
    }
}

/// Find the keyboard's input node
pub fn find_keyboard_input_path(cfg: &DeviceConfig) -> KeyboardNode {
    let fallback = KeyboardNode {
        path: PathBuf::from(&cfg.fallback_event_path),
        name: None,
    };

    let entries = match std::fs::read_dir(&cfg.input_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot scan {}: {}", cfg.input_dir, e);
            return fallback;
        }
    };

    let mut nodes: Vec<String> = entries
        .flatten()
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .filter(|name| name.starts_with("event"))
        .collect();
    // eventN order, not readdir order
    nodes.sort_by_key(|name| (event_index(name), name.clone()));

    let keywords: Vec<String> = cfg.name_keywords.iter().map(|k| k.to_lowercase()).collect();
    let sysfs = Path::new(&cfg.sysfs_input_dir);

    for node in nodes {
        let name_path = sysfs.join(&node).join("device").join("name");
        let Ok(raw) = std::fs::read_to_string(&name_path) else {
            continue;
        };
        let device_name = raw.trim();
        debug!("Input node {}: {}", node, device_name);

        if matches_keyboard(device_name, &keywords) {
            let path = Path::new(&cfg.input_dir).join(&node);
            info!("Found keyboard at: {} - Device: {}", path.display(), device_name);
            return KeyboardNode {
                path,
                name: Some(device_name.to_string()),
            };
        }
    }

    warn!(
        "Could not find keyboard device, using default path {}",
        cfg.fallback_event_path
    );
    fallback
}

/// Case-insensitive substring match; `keywords` must already be lowercase
fn matches_keyboard(device_name: &str, keywords: &[String]) -> bool {
    let lower = device_name.to_lowercase();
    keywords.iter().any(|k| !k.is_empty() && lower.contains(k.as_str()))
}

fn event_index(node: &str) -> u32 {
    node.trim_start_matches("event").parse().unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Fake /dev/input + /sys/class/input trees
    fn fixture(devices: &[(&str, Option<&str>)]) -> (tempfile::TempDir, DeviceConfig) {
        let root = tempfile::tempdir().unwrap();
        let input = root.path().join("dev-input");
        let sysfs = root.path().join("sys-input");
        fs::create_dir_all(&input).unwrap();
        for (node, name) in devices {
            fs::write(input.join(node), b"").unwrap();
            if let Some(name) = name {
                let dir = sysfs.join(node).join("device");
                fs::create_dir_all(&dir).unwrap();
                fs::write(dir.join("name"), format!("{}\n", name)).unwrap();
            }
        }
        let cfg = DeviceConfig {
            input_dir: input.to_string_lossy().into_owned(),
            sysfs_input_dir: sysfs.to_string_lossy().into_owned(),
            fallback_event_path: "/nonexistent/event12".to_string(),
            ..DeviceConfig::default()
        };
        (root, cfg)
    }

    #[test]
    fn test_finds_keyboard_case_insensitive() {
        let (_root, cfg) = fixture(&[
            ("event0", Some("gpio-keys")),
            ("event3", Some("Xiaomi Keyboard")),
            ("mice", None),
        ]);
        let node = find_keyboard_input_path(&cfg);
        assert!(node.path.ends_with("event3"));
        assert_eq!(node.name.as_deref(), Some("Xiaomi Keyboard"));
    }

    #[test]
    fn test_first_match_in_numeric_order() {
        let (_root, cfg) = fixture(&[
            ("event10", Some("XKBD consumer")),
            ("event2", Some("pipa keyboard")),
        ]);
        let node = find_keyboard_input_path(&cfg);
        assert!(node.path.ends_with("event2"));
    }

    #[test]
    fn test_fallback_when_no_match() {
        let (_root, cfg) = fixture(&[("event0", Some("touchscreen")), ("event1", None)]);
        let node = find_keyboard_input_path(&cfg);
        assert_eq!(node.path, PathBuf::from("/nonexistent/event12"));
        assert_eq!(node.name, None);
    }

    #[test]
    fn test_fallback_when_dir_missing() {
        let cfg = DeviceConfig {
            input_dir: "/nonexistent/input".to_string(),
            ..DeviceConfig::default()
        };
        let node = find_keyboard_input_path(&cfg);
        assert_eq!(node.path, PathBuf::from(crate::constants::FALLBACK_EVENT_PATH));
    }

    #[test]
    fn test_node_presence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event5");
        let node = NodePresence::new(&path);
        assert!(!node.is_present());
        fs::write(&path, b"").unwrap();
        assert!(node.is_present());
    }
}
