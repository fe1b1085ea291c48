//! SO(3) helpers for strapdown attitude propagation.
//!
//! Orientations are `UnitQuaternion<f64>` mapping body-frame vectors into the
//! world frame. Euler angles use the fixed-axis XYZ convention
//! (R = Rz(yaw) · Ry(pitch) · Rx(roll)), matching nalgebra's
//! `from_euler_angles` / `euler_angles` pair.

use nalgebra::{Unit, UnitQuaternion, Vector3};

/// Rotation angles at or below this are treated as no rotation.
pub const SMALL_ANGLE_THRESHOLD: f64 = 1e-6;

/// Roll/pitch/yaw triple (radians).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerXyz {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl EulerXyz {
    pub fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { roll, pitch, yaw }
    }

    pub fn from_rotation(q: &UnitQuaternion<f64>) -> Self {
        let (roll, pitch, yaw) = q.euler_angles();
        Self { roll, pitch, yaw }
    }

    pub fn to_rotation(self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_euler_angles(self.roll, self.pitch, self.yaw)
    }
}

/// Rotation increment for a constant angular velocity held over `dt`.
///
/// Returns `None` when `|ω|·dt <= min_angle`, where the axis is numerically
/// meaningless.
pub fn rotation_increment(
    omega: &Vector3<f64>,
    dt: f64,
    min_angle: f64,
) -> Option<UnitQuaternion<f64>> {
    let rate = omega.norm();
    let angle = rate * dt;
    if angle <= min_angle {
        return None;
    }
    let axis = Unit::new_unchecked(omega / rate);
    Some(UnitQuaternion::from_axis_angle(&axis, angle))
}

/// Roll and pitch implied by a gravity-dominated accelerometer reading.
///
/// Returns `(roll, pitch)`; yaw is unobservable from gravity alone.
pub fn leveling_angles(accel: &Vector3<f64>) -> (f64, f64) {
    let pitch = (-accel.x).atan2((accel.y * accel.y + accel.z * accel.z).sqrt());
    let roll = accel.y.atan2(accel.z);
    (roll, pitch)
}
