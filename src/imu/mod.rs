pub mod calibration;
pub mod sample;
pub mod stationary;

pub use calibration::{Calibration, CalibrationError, CalibrationEstimator};
pub use sample::{GRAVITY_MAGNITUDE, GRAVITY_REACTION, GravityMode, ImuBias, InertialSample};
pub use stationary::StationaryDetector;
