//! Dead-reckoning estimator: calibration → ZUPT → attitude → kinematics.

pub mod attitude;
pub mod config;
pub mod error;
#[allow(clippy::module_inception)]
mod estimator;
pub mod kinematics;
pub mod pose;
pub mod state;


pub use attitude::{AttitudeIntegrator, AttitudeUpdate};
pub use config::{ConfigError, EstimatorConfig};
pub use error::EstimatorError;
pub use estimator::PoseEstimator;
pub use kinematics::KinematicIntegrator;
pub use pose::PoseRecord;
pub use state::FilterState;
