//! Trajectory error metrics.
//!
//! Poses are associated by relative index (`i * len / min_len`), not by
//! timestamp, so both trajectories are expected to cover the same span.

use crate::estimator::PoseRecord;

/// Target number of associated pairs for ATE; longer trajectories are
/// strided by `len / DEFAULT_MAX_PAIRS`.
pub const DEFAULT_MAX_PAIRS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryMetrics {
    /// Root-mean-square absolute position error (m).
    pub ate_rmse: f64,
    pub ate_mean: f64,
    pub ate_max: f64,
    /// Distance between the estimate's first and last position (m). For a
    /// closed loop this is the accumulated drift.
    pub endpoint_error: Option<f64>,
    pub pairs: usize,
}

impl TrajectoryMetrics {
    /// `None` if either trajectory is empty.
    pub fn compute(
        estimate: &[PoseRecord],
        ground_truth: &[PoseRecord],
        max_pairs: usize,
    ) -> Option<Self> {
        let errors = position_errors(estimate, ground_truth, max_pairs);
        if errors.is_empty() {
            return None;
        }

        let n = errors.len() as f64;
        let ate_mean = errors.iter().sum::<f64>() / n;
        let ate_rmse = (errors.iter().map(|e| e * e).sum::<f64>() / n).sqrt();
        let ate_max = errors.iter().copied().fold(0.0, f64::max);

        Some(Self {
            ate_rmse,
            ate_mean,
            ate_max,
            endpoint_error: endpoint_error(estimate),
            pairs: errors.len(),
        })
    }
}

/// Position error at up to `max_pairs` index-associated pose pairs.
pub fn position_errors(
    estimate: &[PoseRecord],
    ground_truth: &[PoseRecord],
    max_pairs: usize,
) -> Vec<f64> {
    let min_len = estimate.len().min(ground_truth.len());
    if min_len == 0 {
        return Vec::new();
    }
    let stride = (min_len / max_pairs.max(1)).max(1);

    (0..min_len)
        .step_by(stride)
        .map(|i| {
            let gt = &ground_truth[associate(i, ground_truth.len(), min_len)];
            let est = &estimate[associate(i, estimate.len(), min_len)];
            (gt.position - est.position).norm()
        })
        .collect()
}

pub(crate) fn associate(i: usize, len: usize, min_len: usize) -> usize {
    (i * len / min_len).min(len - 1)
}

/// Start-to-end distance; `None` for fewer than two poses.
pub fn endpoint_error(trajectory: &[PoseRecord]) -> Option<f64> {
    match trajectory {
        [first, .., last] => Some((last.position - first.position).norm()),
        _ => None,
    }
}
