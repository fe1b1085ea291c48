//! Mutable per-stream filter state.

use nalgebra::{UnitQuaternion, Vector3};

use crate::imu::StationaryDetector;

/// Everything that changes from one accepted sample to the next.
///
/// Owned by exactly one `PoseEstimator`; all fields advance together.
#[derive(Debug, Clone)]
pub struct FilterState {
    /// World-from-body orientation.
    pub orientation: UnitQuaternion<f64>,
    /// World-frame velocity (m/s).
    pub velocity: Vector3<f64>,
    /// World-frame position (m).
    pub position: Vector3<f64>,
    /// Timestamp of the most recent sample seen, accepted or not.
    pub last_timestamp: Option<f64>,
    /// Classification made on the most recent accepted sample.
    pub stationary: bool,
    pub detector: StationaryDetector,
}

impl FilterState {
    pub fn new(orientation: UnitQuaternion<f64>, detector: StationaryDetector) -> Self {
        Self {
            orientation,
            velocity: Vector3::zeros(),
            position: Vector3::zeros(),
            last_timestamp: None,
            stationary: false,
            detector,
        }
    }
}
