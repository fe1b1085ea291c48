//! Startup calibration from a stationary window.
//!
//! Collects the first `calibration_count` raw samples while the platform is
//! assumed to be at rest, then freezes:
//! - the gravity mode (does the accelerometer stream carry gravity?)
//! - accelerometer and gyroscope biases
//! - the initial orientation (roll/pitch from gravity, yaw = 0)
//!
//! ```ignore
//! let mut calib = CalibrationEstimator::new(200, 7.0, 9.81);
//! for sample in stream {
//!     if let Some(result) = calib.ingest_calibration_sample(&sample)? {
//!         // biases are frozen from here on
//!     }
//! }
//! ```

use nalgebra::{UnitQuaternion, Vector3};
use thiserror::Error;
use tracing::{info, warn};

use super::sample::{GravityMode, ImuBias, InertialSample};
use crate::geometry::so3::{leveling_angles, EulerXyz};

/// Mean per-axis gyro variance ((rad/s)^2) above which the window is suspect.
const GYRO_VARIANCE_WARN: f64 = 1e-3;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("calibration already finalized")]
    AlreadyCalibrated,
}

/// Frozen output of the calibration window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub gravity_mode: GravityMode,
    pub bias: ImuBias,
    /// World-from-body orientation at the end of the window.
    pub initial_orientation: UnitQuaternion<f64>,
    /// Mean accelerometer norm over the window (m/s^2).
    pub mean_accel_norm: f64,
    /// Mean per-axis gyro variance over the window ((rad/s)^2).
    pub gyro_variance: f64,
    pub sample_count: usize,
}

/// Accumulates raw samples until the calibration window is full.
#[derive(Debug, Clone)]
pub struct CalibrationEstimator {
    target_samples: usize,
    gravity_present_threshold: f64,
    gravity_magnitude: f64,
    count: usize,
    accel_sum: Vector3<f64>,
    accel_norm_sum: f64,
    gyro_sum: Vector3<f64>,
    gyro_sq_sum: Vector3<f64>,
    result: Option<Calibration>,
}

impl CalibrationEstimator {
    pub fn new(target_samples: usize, gravity_present_threshold: f64, gravity_magnitude: f64) -> Self {
        Self {
            target_samples: target_samples.max(1),
            gravity_present_threshold,
            gravity_magnitude,
            count: 0,
            accel_sum: Vector3::zeros(),
            accel_norm_sum: 0.0,
            gyro_sum: Vector3::zeros(),
            gyro_sq_sum: Vector3::zeros(),
            result: None,
        }
    }

    /// Add one raw sample to the window.
    ///
    /// Returns `Ok(Some(..))` exactly once, on the sample that completes the
    /// window. Any call after that is a caller error.
    pub fn ingest_calibration_sample(
        &mut self,
        sample: &InertialSample,
    ) -> Result<Option<Calibration>, CalibrationError> {
        if self.result.is_some() {
            return Err(CalibrationError::AlreadyCalibrated);
        }

        self.accel_sum += sample.accel;
        self.accel_norm_sum += sample.accel.norm();
        self.gyro_sum += sample.gyro;
        self.gyro_sq_sum += sample.gyro.component_mul(&sample.gyro);
        self.count += 1;

        if self.count < self.target_samples {
            return Ok(None);
        }

        let calibration = self.finalize();
        self.result = Some(calibration);
        Ok(Some(calibration))
    }

    fn finalize(&self) -> Calibration {
        let n = self.count as f64;
        let mean_accel = self.accel_sum / n;
        let mean_accel_norm = self.accel_norm_sum / n;
        let mean_gyro = self.gyro_sum / n;
        let gyro_var = self.gyro_sq_sum / n - mean_gyro.component_mul(&mean_gyro);
        let gyro_variance = gyro_var.map(|v| v.max(0.0)).mean();

        let (gravity_mode, accel_bias, initial_orientation) =
            if mean_accel_norm > self.gravity_present_threshold {
                let expected = Vector3::new(0.0, 0.0, self.gravity_magnitude);
                let (roll, pitch) = leveling_angles(&mean_accel);
                (
                    GravityMode::Included,
                    mean_accel - expected,
                    EulerXyz::new(roll, pitch, 0.0).to_rotation(),
                )
            } else {
                (GravityMode::Excluded, mean_accel, UnitQuaternion::identity())
            };

        let euler = EulerXyz::from_rotation(&initial_orientation);
        info!(
            samples = self.count,
            mean_accel_norm,
            ?gravity_mode,
            "Calibration done: accel bias [{:.4}, {:.4}, {:.4}], gyro bias [{:.4}, {:.4}, {:.4}], roll {:.2} deg, pitch {:.2} deg",
            accel_bias.x,
            accel_bias.y,
            accel_bias.z,
            mean_gyro.x,
            mean_gyro.y,
            mean_gyro.z,
            euler.roll.to_degrees(),
            euler.pitch.to_degrees(),
        );
        if gyro_variance > GYRO_VARIANCE_WARN {
            warn!(
                gyro_variance,
                "Gyro variance high during calibration; platform may not have been stationary"
            );
        }

        Calibration {
            gravity_mode,
            bias: ImuBias {
                gyro: mean_gyro,
                accel: accel_bias,
            },
            initial_orientation,
            mean_accel_norm,
            gyro_variance,
            sample_count: self.count,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.result.is_some()
    }

    pub fn result(&self) -> Option<&Calibration> {
        self.result.as_ref()
    }

    pub fn sample_count(&self) -> usize {
        self.count
    }

    pub fn target_samples(&self) -> usize {
        self.target_samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample(gyro: Vector3<f64>, accel: Vector3<f64>) -> InertialSample {
        InertialSample::new(0.0, gyro, accel)
    }

    fn run(calib: &mut CalibrationEstimator, s: InertialSample, n: usize) -> Calibration {
        for _ in 0..n - 1 {
            assert!(calib.ingest_calibration_sample(&s).unwrap().is_none());
        }
        calib.ingest_calibration_sample(&s).unwrap().unwrap()
    }

    #[test]
    fn test_gravity_included_level() {
        let mut calib = CalibrationEstimator::new(200, 7.0, 9.81);
        let gyro = Vector3::new(0.01, -0.02, 0.003);
        let accel = Vector3::new(0.05, -0.03, 9.8);

        let result = run(&mut calib, sample(gyro, accel), 200);

        assert_eq!(result.gravity_mode, GravityMode::Included);
        assert_eq!(result.sample_count, 200);
        assert_relative_eq!(result.bias.gyro, gyro, epsilon = 1e-12);
        assert_relative_eq!(
            result.bias.accel,
            Vector3::new(0.05, -0.03, 9.8 - 9.81),
            epsilon = 1e-12
        );

        let euler = EulerXyz::from_rotation(&result.initial_orientation);
        assert_relative_eq!(euler.roll, (-0.03f64).atan2(9.8), epsilon = 1e-12);
        assert_relative_eq!(
            euler.pitch,
            (-0.05f64).atan2((0.03f64 * 0.03 + 9.8 * 9.8).sqrt()),
            epsilon = 1e-12
        );
        assert_relative_eq!(euler.yaw, 0.0, epsilon = 1e-12);
        assert_relative_eq!(result.gyro_variance, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gravity_included_tilted_initial_orientation() {
        let tilt = EulerXyz::new(0.2, -0.1, 0.0).to_rotation();
        let accel = tilt.inverse() * Vector3::new(0.0, 0.0, 9.81);
        let mut calib = CalibrationEstimator::new(10, 7.0, 9.81);

        let result = run(&mut calib, sample(Vector3::zeros(), accel), 10);

        assert_eq!(result.gravity_mode, GravityMode::Included);
        assert_relative_eq!(result.initial_orientation.angle_to(&tilt), 0.0, epsilon = 1e-7);
    }

    #[test]
    fn test_gravity_excluded() {
        let mut calib = CalibrationEstimator::new(200, 7.0, 9.81);
        let gyro = Vector3::new(-0.004, 0.0, 0.002);
        let accel = Vector3::new(0.01, 0.0, 0.0173);

        let result = run(&mut calib, sample(gyro, accel), 200);

        assert_relative_eq!(result.mean_accel_norm, accel.norm(), epsilon = 1e-12);
        assert_eq!(result.gravity_mode, GravityMode::Excluded);
        assert_relative_eq!(result.bias.accel, accel, epsilon = 1e-12);
        assert_relative_eq!(result.bias.gyro, gyro, epsilon = 1e-12);
        assert_eq!(result.initial_orientation, UnitQuaternion::identity());
    }

    #[test]
    fn test_mode_uses_mean_norm_not_norm_of_mean() {
        // Alternating +/-9.8 on x: mean vector is zero but every reading is gravity-sized.
        let mut calib = CalibrationEstimator::new(4, 7.0, 9.81);
        let a = sample(Vector3::zeros(), Vector3::new(9.8, 0.0, 0.0));
        let b = sample(Vector3::zeros(), Vector3::new(-9.8, 0.0, 0.0));
        calib.ingest_calibration_sample(&a).unwrap();
        calib.ingest_calibration_sample(&b).unwrap();
        calib.ingest_calibration_sample(&a).unwrap();
        let result = calib.ingest_calibration_sample(&b).unwrap().unwrap();

        assert_eq!(result.gravity_mode, GravityMode::Included);
    }

    #[test]
    fn test_gyro_variance() {
        let mut calib = CalibrationEstimator::new(2, 7.0, 9.81);
        calib
            .ingest_calibration_sample(&sample(Vector3::new(0.1, 0.0, 0.0), Vector3::zeros()))
            .unwrap();
        let result = calib
            .ingest_calibration_sample(&sample(Vector3::new(-0.1, 0.0, 0.0), Vector3::zeros()))
            .unwrap()
            .unwrap();

        // Per-axis variances (0.01, 0, 0) averaged over three axes.
        assert_relative_eq!(result.gyro_variance, 0.01 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(result.bias.gyro, Vector3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn test_reentry_rejected() {
        let mut calib = CalibrationEstimator::new(3, 7.0, 9.81);
        let s = sample(Vector3::zeros(), Vector3::new(0.0, 0.0, 9.81));
        let first = run(&mut calib, s, 3);

        assert!(calib.is_complete());
        assert_eq!(
            calib.ingest_calibration_sample(&s),
            Err(CalibrationError::AlreadyCalibrated)
        );
        // Frozen result unchanged.
        assert_eq!(calib.result(), Some(&first));
        assert_eq!(calib.sample_count(), 3);
    }
}
