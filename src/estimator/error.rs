use thiserror::Error;

use crate::imu::CalibrationError;

/// Caller-contract violations surfaced by the estimator.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorError {
    /// A calibration sample was offered after biases were frozen.
    #[error("calibration sample offered after calibration completed")]
    CalibrationReentry,
}

impl From<CalibrationError> for EstimatorError {
    fn from(e: CalibrationError) -> Self {
        match e {
            CalibrationError::AlreadyCalibrated => EstimatorError::CalibrationReentry,
        }
    }
}
