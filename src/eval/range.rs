//! Range-to-anchor analysis.
//!
//! Reduces each pose to its Euclidean distance from a fixed anchor point, as
//! a single ranging beacon would observe it, and compares the estimate's
//! range series against ground truth.

use nalgebra::Vector3;

use super::metrics::associate;
use crate::estimator::PoseRecord;

/// Upper bound on compared ranges; longer series are strided.
pub const DEFAULT_RANGE_PAIRS: usize = 500;

/// Distance from `anchor` for every pose, in order.
pub fn anchor_ranges(trajectory: &[PoseRecord], anchor: &Vector3<f64>) -> Vec<f64> {
    trajectory
        .iter()
        .map(|p| (p.position - anchor).norm())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeErrors {
    /// Mean absolute range difference (m).
    pub mean: f64,
    pub max: f64,
    pub pairs: usize,
}

impl RangeErrors {
    /// Compare range series by index-proportional association.
    ///
    /// `None` if either trajectory is empty.
    pub fn compute(
        estimate: &[PoseRecord],
        ground_truth: &[PoseRecord],
        anchor: &Vector3<f64>,
        max_pairs: usize,
    ) -> Option<Self> {
        let est = anchor_ranges(estimate, anchor);
        let gt = anchor_ranges(ground_truth, anchor);
        let min_len = est.len().min(gt.len());
        if min_len == 0 {
            return None;
        }
        let stride = (min_len / max_pairs.max(1)).max(1);

        let diffs: Vec<f64> = (0..min_len)
            .step_by(stride)
            .map(|i| (est[associate(i, est.len(), min_len)] - gt[associate(i, gt.len(), min_len)]).abs())
            .collect();

        Some(Self {
            mean: diffs.iter().sum::<f64>() / diffs.len() as f64,
            max: diffs.iter().copied().fold(0.0, f64::max),
            pairs: diffs.len(),
        })
    }
}
