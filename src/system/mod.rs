//! Threaded hosting of the estimator.
//!
//! `PosePipeline` runs a single `PoseEstimator` on its own thread, fed by a
//! bounded channel, and publishes poses plus a shared path history.

pub mod messages;
mod pipeline;
pub mod shared_state;

pub use messages::PipelineCommand;
pub use pipeline::{PipelineError, PosePipeline};
pub use shared_state::{PipelineStatus, SharedPoseState};
