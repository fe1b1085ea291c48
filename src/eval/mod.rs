//! Offline evaluation against ground truth: alignment, error metrics and
//! range-to-anchor comparison.

pub mod alignment;
pub mod metrics;
pub mod range;

pub use alignment::{
    align_trajectory, umeyama_alignment, AlignedTrajectory, AlignmentError, DEFAULT_MAX_SAMPLES,
};
pub use metrics::{endpoint_error, position_errors, TrajectoryMetrics, DEFAULT_MAX_PAIRS};
pub use range::{anchor_ranges, RangeErrors, DEFAULT_RANGE_PAIRS};
