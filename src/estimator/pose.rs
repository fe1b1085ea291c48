use nalgebra::{UnitQuaternion, Vector3};

/// Pose snapshot emitted after every accepted sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseRecord {
    pub timestamp_s: f64,
    /// World-frame position (m).
    pub position: Vector3<f64>,
    /// World-from-body orientation.
    pub orientation: UnitQuaternion<f64>,
}

impl PoseRecord {
    pub fn new(timestamp_s: f64, position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            timestamp_s,
            position,
            orientation,
        }
    }

    /// False once NaN/inf has leaked into the estimate; the caller should
    /// reset the estimator.
    pub fn is_finite(&self) -> bool {
        self.timestamp_s.is_finite()
            && self.position.iter().all(|v| v.is_finite())
            && self.orientation.coords.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Quaternion, Unit};

    #[test]
    fn test_is_finite() {
        let pose = PoseRecord::new(1.0, Vector3::new(1.0, 2.0, 3.0), UnitQuaternion::identity());
        assert!(pose.is_finite());

        let pose = PoseRecord::new(1.0, Vector3::new(f64::NAN, 0.0, 0.0), UnitQuaternion::identity());
        assert!(!pose.is_finite());

        let bad_q = Unit::new_unchecked(Quaternion::new(f64::INFINITY, 0.0, 0.0, 0.0));
        let pose = PoseRecord::new(1.0, Vector3::zeros(), bad_q);
        assert!(!pose.is_finite());
    }
}
