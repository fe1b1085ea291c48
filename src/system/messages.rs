//! Messages sent from the caller to the estimator thread.

use crate::imu::InertialSample;

#[derive(Debug, Clone, Copy)]
pub enum PipelineCommand {
    /// Raw sample, in arrival order.
    Sample(InertialSample),
    /// Drop all state and start calibrating again.
    Reset,
}
