use nalgebra::Vector3;

/// Standard gravity magnitude (m/s^2).
pub const GRAVITY_MAGNITUDE: f64 = 9.81;

/// Gravity reaction as sensed by a level accelerometer at rest (+Z up).
pub const GRAVITY_REACTION: Vector3<f64> = Vector3::new(0.0, 0.0, GRAVITY_MAGNITUDE);

/// Single IMU measurement in the body frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InertialSample {
    /// Monotonic timestamp in seconds.
    pub timestamp_s: f64,
    /// Angular velocity (rad/s).
    pub gyro: Vector3<f64>,
    /// Linear acceleration (m/s^2).
    pub accel: Vector3<f64>,
}

impl InertialSample {
    pub fn new(timestamp_s: f64, gyro: Vector3<f64>, accel: Vector3<f64>) -> Self {
        Self {
            timestamp_s,
            gyro,
            accel,
        }
    }

    /// Subtract a bias estimate from both channels.
    pub fn corrected(&self, bias: &ImuBias) -> Self {
        Self {
            timestamp_s: self.timestamp_s,
            gyro: self.gyro - bias.gyro,
            accel: self.accel - bias.accel,
        }
    }
}

/// IMU biases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuBias {
    pub gyro: Vector3<f64>,
    pub accel: Vector3<f64>,
}

/// Whether the accelerometer stream carries the gravity reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GravityMode {
    /// Raw readings include gravity; it must be subtracted in the world frame.
    Included,
    /// Readings are already gravity-compensated (linear acceleration only).
    Excluded,
}

impl GravityMode {
    pub fn subtracts_gravity(self) -> bool {
        matches!(self, Self::Included)
    }
}
