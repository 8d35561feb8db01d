//! Folding angle detection
//!
//! Two accelerometers, one in the tablet body and one in the keyboard tray,
//! both measure gravity. The angle between the two vectors tells how far
//! the keyboard is folded; past the disable angle it sits behind the screen
//! and key presses would be ghost input.

use log::debug;

pub type Vec3 = [f32; 3];

/// Result of a recompute
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoldDecision {
    /// Folding angle in degrees
    pub angle: f32,
    /// Requested keyboard state
    pub enable: bool,
}

pub struct FusionEngine {
    /// Latest tablet body vector
    body: Vec3,
    /// Latest keyboard tray vector
    tray: Vec3,
    /// Unit vectors (body, tray) at the last recompute
    last_computed: Option<(Vec3, Vec3)>,
    delta_threshold: f32,
    disable_angle: f32,
    /// Tray updates received
    tray_updates: u64,
}

impl FusionEngine {
    pub fn new(delta_threshold: f32, disable_angle: f32) -> Self {
        Self {
            body: [0.0; 3],
            tray: [0.0; 3],
            last_computed: None,
            delta_threshold,
            disable_angle,
            tray_updates: 0,
        }
    }

    pub fn body(&self) -> Vec3 {
        self.body
    }

    pub fn tray(&self) -> Vec3 {
        self.tray
    }

    pub fn tray_updates(&self) -> u64 {
        self.tray_updates
    }

    pub fn set_body(&mut self, v: Vec3) {
        self.body = v;
    }

    /// Feed a tray sample; returns a decision when the pose moved enough
    pub fn update_tray(&mut self, v: Vec3) -> Option<FoldDecision> {
        self.tray = v;
        self.tray_updates += 1;

        let current = (normalize(self.body), normalize(self.tray));
        if let Some((body, tray)) = self.last_computed {
            let delta = distance_sq(current.0, body) + distance_sq(current.1, tray);
            if delta <= self.delta_threshold {
                return None;
            }
        }
        self.last_computed = Some(current);

        let angle = folding_angle(self.body, self.tray);
        let enable = should_enable(angle, self.disable_angle);
        debug!("Folding angle {:.1} deg -> enable={}", angle, enable);
        Some(FoldDecision { angle, enable })
    }
}

/// Angle between two vectors in degrees; 0 if either has zero length
pub fn folding_angle(a: Vec3, b: Vec3) -> f32 {
    let (la, lb) = (length(a), length(b));
    if la == 0.0 || lb == 0.0 {
        return 0.0;
    }
    let cos = (dot(a, b) / (la * lb)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Keyboard stays usable below the disable angle
pub fn should_enable(angle: f32, disable_angle: f32) -> bool {
    angle < disable_angle
}

fn dot(a: Vec3, b: Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn length(v: Vec3) -> f32 {
    dot(v, v).sqrt()
}

fn normalize(v: Vec3) -> Vec3 {
    let len = length(v);
    if len == 0.0 {
        return [0.0; 3];
    }
    [v[0] / len, v[1] / len, v[2] / len]
}

fn distance_sq(a: Vec3, b: Vec3) -> f32 {
    let d = [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
    dot(d, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> FusionEngine {
        FusionEngine::new(0.04, 120.0)
    }

    #[test]
    fn test_angle_boundary() {
        assert!(should_enable(119.0, 120.0));
        assert!(!should_enable(120.0, 120.0));
        assert!(!should_enable(180.0, 120.0));
    }

    #[test]
    fn test_folding_angle() {
        assert!((folding_angle([0.0, 0.0, 9.8], [0.0, 0.0, 512.0]) - 0.0).abs() < 0.01);
        assert!((folding_angle([0.0, 0.0, 1.0], [0.0, 1.0, 0.0]) - 90.0).abs() < 0.01);
        assert!((folding_angle([1.0, 0.0, 0.0], [-3.0, 0.0, 0.0]) - 180.0).abs() < 0.01);
        assert_eq!(folding_angle([0.0; 3], [1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_first_update_computes() {
        let mut e = engine();
        e.set_body([0.0, 0.0, 1.0]);
        let d = e.update_tray([0.0, 0.0, -1.0]).unwrap();
        assert!((d.angle - 180.0).abs() < 0.01);
        assert!(!d.enable);
    }

    #[test]
    fn test_small_motion_skipped() {
        let mut e = engine();
        e.set_body([0.0, 0.0, 1.0]);
        assert!(e.update_tray([0.0, 0.0, 1.0]).is_some());
        // ~5 degrees: squared chord ~0.0076
        assert!(e.update_tray([0.087, 0.0, 0.996]).is_none());
        assert_eq!(e.tray_updates(), 2);
    }

    #[test]
    fn test_large_motion_recomputes() {
        let mut e = engine();
        e.set_body([0.0, 0.0, 1.0]);
        assert!(e.update_tray([0.0, 0.0, 1.0]).unwrap().enable);
        let d = e.update_tray([0.0, -0.5, -0.866]).unwrap();
        assert!((d.angle - 150.0).abs() < 0.1);
        assert!(!d.enable);
    }

    #[test]
    fn test_scale_independent() {
        let mut e = engine();
        e.set_body([0.0, 0.0, 9.81]);
        assert!(e.update_tray([0.0, 0.0, 512.0]).is_some());
        // Same direction, different magnitude: no recompute
        assert!(e.update_tray([0.0, 0.0, 1000.0]).is_none());
    }

    #[test]
    fn test_update_at_disable_boundary() {
        for (deg, enable) in [(119.0f32, true), (120.5, false)] {
            let mut e = engine();
            e.set_body([0.0, 0.0, 1.0]);
            let rad = deg.to_radians();
            let d = e.update_tray([0.0, rad.sin(), rad.cos()]).unwrap();
            assert!((d.angle - deg).abs() < 0.05, "angle {} for {}", d.angle, deg);
            assert_eq!(d.enable, enable, "at {} deg", deg);
        }
    }
}
