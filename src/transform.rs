//! Transform snapshots of the shared object.
//!
//! DESIGN
//! ======
//! A `Snapshot` is a plain value: position, rotation, scale. Change detection
//! compares each field against its own threshold (distance for vectors,
//! angle for rotation) so sub-threshold jitter never reaches the wire.

use frames::{Quaternion, TransformUpdate, Vector3};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_POSITION_THRESHOLD, DEFAULT_ROTATION_THRESHOLD_DEG, DEFAULT_SCALE_THRESHOLD};

/// Per-field change thresholds. A field counts as changed only when its
/// difference is strictly greater than its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Position distance, world units.
    pub position: f32,
    /// Rotation angle, degrees.
    pub rotation_degrees: f32,
    /// Scale distance.
    pub scale: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            position: DEFAULT_POSITION_THRESHOLD,
            rotation_degrees: DEFAULT_ROTATION_THRESHOLD_DEG,
            scale: DEFAULT_SCALE_THRESHOLD,
        }
    }
}

/// The instantaneous transform of the shared object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self { position: Vec3::ZERO, rotation: Quat::IDENTITY, scale: Vec3::ONE }
    }
}

impl Snapshot {
    #[must_use]
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self { position, rotation, scale }
    }

    /// True when any field moved past its threshold relative to `other`.
    #[must_use]
    pub fn differs_from(&self, other: &Snapshot, thresholds: &Thresholds) -> bool {
        self.position.distance(other.position) > thresholds.position
            || rotation_degrees_between(self.rotation, other.rotation) > thresholds.rotation_degrees
            || self.scale.distance(other.scale) > thresholds.scale
    }

    /// Inverse of [`Snapshot::differs_from`].
    #[must_use]
    pub fn approx_eq(&self, other: &Snapshot, thresholds: &Thresholds) -> bool {
        !self.differs_from(other, thresholds)
    }

    /// Move toward `target` by exponential smoothing over `dt` seconds.
    ///
    /// The blend factor is `1 - e^(-speed * dt)`, so the result is frame-rate
    /// independent and never overshoots.
    #[must_use]
    pub fn interpolate_toward(&self, target: &Snapshot, speed: f32, dt: f32) -> Snapshot {
        let t = smoothing_factor(speed, dt);
        Snapshot {
            position: self.position.lerp(target.position, t),
            rotation: self.rotation.slerp(target.rotation, t).normalize(),
            scale: self.scale.lerp(target.scale, t),
        }
    }
}

/// Blend factor in `[0, 1]` for exponential smoothing.
#[must_use]
pub fn smoothing_factor(speed: f32, dt: f32) -> f32 {
    if !(speed.is_finite() && dt.is_finite()) || speed <= 0.0 || dt <= 0.0 {
        return 0.0;
    }
    (1.0 - (-speed * dt).exp()).clamp(0.0, 1.0)
}

fn rotation_degrees_between(a: Quat, b: Quat) -> f32 {
    a.normalize().angle_between(b.normalize()).to_degrees()
}

// =============================================================================
// WIRE CONVERSIONS
// =============================================================================

impl From<Snapshot> for TransformUpdate {
    fn from(s: Snapshot) -> Self {
        TransformUpdate {
            position: Vector3::new(s.position.x, s.position.y, s.position.z),
            rotation: Quaternion::new(s.rotation.x, s.rotation.y, s.rotation.z, s.rotation.w),
            scale: Vector3::new(s.scale.x, s.scale.y, s.scale.z),
        }
    }
}

impl From<TransformUpdate> for Snapshot {
    fn from(u: TransformUpdate) -> Self {
        let rotation = Quat::from_xyzw(u.rotation.x, u.rotation.y, u.rotation.z, u.rotation.w);
        Snapshot {
            position: Vec3::new(u.position.x, u.position.y, u.position.z),
            // A zero quaternion off the wire would poison slerp; treat it as identity.
            rotation: if rotation.length_squared() > 0.0 { rotation.normalize() } else { Quat::IDENTITY },
            scale: Vec3::new(u.scale.x, u.scale.y, u.scale.z),
        }
    }
}

#[cfg(test)]
#[path = "transform_test.rs"]
mod tests;
