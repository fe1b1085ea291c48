//! Sim3: similarity transform between two trajectory frames.
//!
//! Alignment fits `dst ≈ s * R * src + t`. With `with_scale = false` the
//! scale stays at 1.0 and the transform is rigid.

use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};

use crate::estimator::PoseRecord;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sim3 {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3<f64>,
    pub scale: f64,
}

impl Sim3 {
    /// Build from a proper rotation matrix (det = +1).
    pub fn from_rts(rotation: Matrix3<f64>, translation: Vector3<f64>, scale: f64) -> Self {
        let rot3 = Rotation3::from_matrix_unchecked(rotation);
        Self {
            rotation: UnitQuaternion::from_rotation_matrix(&rot3),
            translation,
            scale,
        }
    }

    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.scale * (self.rotation * p) + self.translation
    }

    /// Map a pose into the target frame: the position is transformed and the
    /// orientation is pre-rotated. Timestamps pass through.
    pub fn transform_pose(&self, pose: &PoseRecord) -> PoseRecord {
        PoseRecord::new(
            pose.timestamp_s,
            self.transform_point(&pose.position),
            self.rotation * pose.orientation,
        )
    }
}
