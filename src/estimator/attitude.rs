//! Attitude propagation with accelerometer leveling.
//!
//! A discrete complementary filter:
//! 1. Integrate the bias-corrected gyro as a body-frame increment
//!    (q ← q ∘ Δq).
//! 2. When gravity is being subtracted and |a| lies inside the leveling gate,
//!    blend roll/pitch toward the gravity-derived estimate:
//!    ```text
//!    roll  = α·roll_gyro  + (1 − α)·roll_acc
//!    pitch = α·pitch_gyro + (1 − α)·pitch_acc
//!    yaw   = yaw_gyro
//!    ```
//!
//! The blend goes through Euler angles and is singular near pitch = ±90°.
//! Sustained linear acceleration close to 1 g passes the gate and is read as
//! tilt.

use nalgebra::{UnitQuaternion, Vector3};

use super::config::EstimatorConfig;
use crate::geometry::so3::{leveling_angles, rotation_increment, EulerXyz};

/// What the attitude stage did for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttitudeUpdate {
    pub propagated: bool,
    pub leveled: bool,
}

#[derive(Debug, Clone)]
pub struct AttitudeIntegrator {
    alpha_normal: f64,
    alpha_stationary: f64,
    gate_min: f64,
    gate_max: f64,
    min_rotation_angle: f64,
}

impl AttitudeIntegrator {
    pub fn new(config: &EstimatorConfig) -> Self {
        Self {
            alpha_normal: config.complementary_alpha_normal,
            alpha_stationary: config.complementary_alpha_stationary,
            gate_min: config.leveling_accel_min,
            gate_max: config.leveling_accel_max,
            min_rotation_angle: config.min_rotation_angle,
        }
    }

    /// Apply the gyro increment. Returns false for a degenerate rotation.
    pub fn propagate(&self, orientation: &mut UnitQuaternion<f64>, gyro: &Vector3<f64>, dt: f64) -> bool {
        match rotation_increment(gyro, dt, self.min_rotation_angle) {
            Some(delta) => {
                *orientation = *orientation * delta;
                orientation.renormalize();
                true
            }
            None => false,
        }
    }

    /// Whether an accelerometer reading looks predominantly gravitational.
    pub fn gate_open(&self, accel: &Vector3<f64>) -> bool {
        let norm = accel.norm();
        norm >= self.gate_min && norm <= self.gate_max
    }

    /// Gyro weight for the roll/pitch blend.
    pub fn alpha(&self, stationary: bool) -> f64 {
        if stationary {
            self.alpha_stationary
        } else {
            self.alpha_normal
        }
    }

    /// Pull roll/pitch toward the accelerometer estimate, leaving yaw alone.
    pub fn level(
        &self,
        orientation: &mut UnitQuaternion<f64>,
        accel: &Vector3<f64>,
        stationary: bool,
    ) -> bool {
        if !self.gate_open(accel) {
            return false;
        }
        let (acc_roll, acc_pitch) = leveling_angles(accel);
        let current = EulerXyz::from_rotation(orientation);
        let alpha = self.alpha(stationary);
        let fused = EulerXyz::new(
            alpha * current.roll + (1.0 - alpha) * acc_roll,
            alpha * current.pitch + (1.0 - alpha) * acc_pitch,
            current.yaw,
        );
        *orientation = fused.to_rotation();
        true
    }

    /// Full attitude step for one bias-corrected sample.
    pub fn update(
        &self,
        orientation: &mut UnitQuaternion<f64>,
        gyro: &Vector3<f64>,
        accel: &Vector3<f64>,
        dt: f64,
        subtract_gravity: bool,
        stationary: bool,
    ) -> AttitudeUpdate {
        let propagated = self.propagate(orientation, gyro, dt);
        let leveled = subtract_gravity && self.level(orientation, accel, stationary);
        AttitudeUpdate { propagated, leveled }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn integrator() -> AttitudeIntegrator {
        AttitudeIntegrator::new(&EstimatorConfig::default())
    }

    #[test]
    fn test_propagate_right_composes_body_increment() {
        let att = integrator();
        let start = UnitQuaternion::from_euler_angles(0.0, 0.0, 0.5);
        let mut q = start;

        // Body-frame x rotation after a world yaw: q = start * Rx.
        assert!(att.propagate(&mut q, &Vector3::new(1.0, 0.0, 0.0), 0.1));

        let expected = start * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.1);
        assert_relative_eq!(q.angle_to(&expected), 0.0, epsilon = 1e-7);
        assert_relative_eq!(q.quaternion().norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_propagate_skips_degenerate_axis() {
        let att = integrator();
        let mut q = UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3);
        let before = q;

        assert!(!att.propagate(&mut q, &Vector3::new(0.0, 0.0, 5e-5), 0.01));
        assert_eq!(q, before);
    }

    #[test]
    fn test_gate_bounds() {
        let att = integrator();
        assert!(att.gate_open(&Vector3::new(0.0, 0.0, 9.81)));
        assert!(att.gate_open(&Vector3::new(0.0, 0.0, 8.0)));
        assert!(att.gate_open(&Vector3::new(0.0, 0.0, 11.0)));
        assert!(!att.gate_open(&Vector3::new(0.0, 0.0, 7.9)));
        assert!(!att.gate_open(&Vector3::new(0.0, 0.0, 11.1)));
    }

    #[test]
    fn test_level_blends_roll_pitch_and_keeps_yaw() {
        let att = integrator();
        let mut q = UnitQuaternion::from_euler_angles(0.5, -0.2, 1.0);

        // Accelerometer says level.
        assert!(att.level(&mut q, &Vector3::new(0.0, 0.0, 9.81), false));

        let euler = EulerXyz::from_rotation(&q);
        assert_relative_eq!(euler.roll, 0.98 * 0.5, epsilon = 1e-9);
        assert_relative_eq!(euler.pitch, 0.98 * -0.2, epsilon = 1e-9);
        assert_relative_eq!(euler.yaw, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_level_trusts_accel_more_when_stationary() {
        let att = integrator();
        let mut q = UnitQuaternion::from_euler_angles(0.5, 0.0, 0.0);

        att.level(&mut q, &Vector3::new(0.0, 0.0, 9.81), true);

        assert_relative_eq!(EulerXyz::from_rotation(&q).roll, 0.9 * 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_level_rejected_outside_gate() {
        let att = integrator();
        let mut q = UnitQuaternion::from_euler_angles(0.5, 0.0, 0.0);
        let before = q;

        assert!(!att.level(&mut q, &Vector3::new(0.0, 0.0, 15.0), false));
        assert_eq!(q, before);
    }

    #[test]
    fn test_update_without_gravity_never_levels() {
        let att = integrator();
        let mut q = UnitQuaternion::from_euler_angles(0.5, 0.0, 0.0);

        let update = att.update(
            &mut q,
            &Vector3::zeros(),
            &Vector3::new(0.0, 0.0, 9.81),
            0.01,
            false,
            true,
        );

        assert_eq!(update, AttitudeUpdate::default());
        assert_relative_eq!(EulerXyz::from_rotation(&q).roll, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_update_reports_both_stages() {
        let att = integrator();
        let mut q = UnitQuaternion::identity();

        let update = att.update(
            &mut q,
            &Vector3::new(0.0, 0.0, 0.5),
            &Vector3::new(0.0, 0.0, 9.81),
            0.01,
            true,
            false,
        );

        assert_eq!(update, AttitudeUpdate { propagated: true, leveled: true });
        assert_relative_eq!(EulerXyz::from_rotation(&q).yaw, 0.005, epsilon = 1e-9);
    }

    #[test]
    fn test_repeated_leveling_converges_to_accel_tilt() {
        let att = integrator();
        let mut q = UnitQuaternion::identity();
        let tilt = UnitQuaternion::from_euler_angles(0.1, 0.05, 0.0);
        let accel = tilt.inverse() * Vector3::new(0.0, 0.0, 9.81);

        for _ in 0..1000 {
            att.level(&mut q, &accel, false);
        }

        let euler = EulerXyz::from_rotation(&q);
        assert_relative_eq!(euler.roll, 0.1, epsilon = 1e-6);
        assert_relative_eq!(euler.pitch, 0.05, epsilon = 1e-6);
    }
}
