//! Umeyama alignment of an estimated trajectory onto ground truth.
//!
//! Given corresponding point sets `src` and `dst`, finds the similarity
//! `(s, R, t)` minimizing `sum ||dst_i - (s * R * src_i + t)||^2`.
//!
//! Reference: S. Umeyama, "Least-squares estimation of transformation
//! parameters between two point patterns", TPAMI 1991.

use nalgebra::{Matrix3, Vector3};
use thiserror::Error;
use tracing::debug;

use crate::estimator::PoseRecord;
use crate::geometry::Sim3;

/// Correspondences used by [`align_trajectory`] unless told otherwise.
pub const DEFAULT_MAX_SAMPLES: usize = 1000;

const MIN_CORRESPONDENCES: usize = 3;
const DEGENERATE_VARIANCE: f64 = 1e-12;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignmentError {
    #[error("need at least {MIN_CORRESPONDENCES} correspondences, got {0}")]
    TooFewPoints(usize),
    #[error("point sets differ in length: {src} source vs {dst} target")]
    LengthMismatch { src: usize, dst: usize },
    #[error("source points have no spread (variance {0:e})")]
    DegenerateSource(f64),
    #[error("SVD of the cross-covariance did not converge")]
    SvdFailed,
}

/// Fit `dst ≈ s * R * src + t`. With `with_scale = false`, `s = 1`.
pub fn umeyama_alignment(
    src: &[Vector3<f64>],
    dst: &[Vector3<f64>],
    with_scale: bool,
) -> Result<Sim3, AlignmentError> {
    if src.len() != dst.len() {
        return Err(AlignmentError::LengthMismatch {
            src: src.len(),
            dst: dst.len(),
        });
    }
    let n = src.len();
    if n < MIN_CORRESPONDENCES {
        return Err(AlignmentError::TooFewPoints(n));
    }

    let mean_src = centroid(src);
    let mean_dst = centroid(dst);

    let mut sigma_src = 0.0;
    let mut cov = Matrix3::zeros();
    for (x, y) in src.iter().zip(dst) {
        let xc = x - mean_src;
        let yc = y - mean_dst;
        sigma_src += xc.norm_squared();
        cov += yc * xc.transpose();
    }
    sigma_src /= n as f64;
    cov /= n as f64;

    if sigma_src < DEGENERATE_VARIANCE {
        return Err(AlignmentError::DegenerateSource(sigma_src));
    }

    let svd = cov.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(AlignmentError::SvdFailed);
    };

    // Flip the weakest direction if U * V^T would be a reflection.
    let mut s = Vector3::repeat(1.0);
    if u.determinant() * v_t.determinant() < 0.0 {
        s[svd.singular_values.imin()] = -1.0;
    }
    let rotation = u * Matrix3::from_diagonal(&s) * v_t;

    let scale = if with_scale {
        svd.singular_values.dot(&s) / sigma_src
    } else {
        1.0
    };
    let translation = mean_dst - scale * (rotation * mean_src);

    Ok(Sim3::from_rts(rotation, translation, scale))
}

fn centroid(points: &[Vector3<f64>]) -> Vector3<f64> {
    if points.is_empty() {
        return Vector3::zeros();
    }
    points.iter().sum::<Vector3<f64>>() / points.len() as f64
}

/// Estimate mapped into the ground-truth frame.
#[derive(Debug, Clone)]
pub struct AlignedTrajectory {
    pub transform: Sim3,
    pub poses: Vec<PoseRecord>,
    /// Point pairs the fit used.
    pub correspondences: usize,
}

/// Rigidly align `estimate` onto `ground_truth`.
///
/// Both trajectories are cut to their common time span, then up to
/// `max_samples` evenly spaced index pairs are fitted. The resulting
/// transform is applied to the whole estimate, including poses outside the
/// common span.
pub fn align_trajectory(
    estimate: &[PoseRecord],
    ground_truth: &[PoseRecord],
    max_samples: usize,
) -> Result<AlignedTrajectory, AlignmentError> {
    let (Some(est_first), Some(est_last), Some(gt_first), Some(gt_last)) = (
        estimate.first(),
        estimate.last(),
        ground_truth.first(),
        ground_truth.last(),
    ) else {
        return Err(AlignmentError::TooFewPoints(0));
    };

    let t_start = est_first.timestamp_s.max(gt_first.timestamp_s);
    let t_end = est_last.timestamp_s.min(gt_last.timestamp_s);
    let in_span = |p: &&PoseRecord| p.timestamp_s >= t_start && p.timestamp_s <= t_end;

    let est_segment: Vec<&PoseRecord> = estimate.iter().filter(in_span).collect();
    let gt_segment: Vec<&PoseRecord> = ground_truth.iter().filter(in_span).collect();

    let n = est_segment.len().min(gt_segment.len()).min(max_samples);
    let src: Vec<Vector3<f64>> = (0..n)
        .map(|i| est_segment[spaced_index(i, n, est_segment.len())].position)
        .collect();
    let dst: Vec<Vector3<f64>> = (0..n)
        .map(|i| gt_segment[spaced_index(i, n, gt_segment.len())].position)
        .collect();

    let transform = umeyama_alignment(&src, &dst, false)?;
    debug!(
        correspondences = n,
        t_start,
        t_end,
        "Aligned trajectory: rotation {:.4} rad, translation [{:.3}, {:.3}, {:.3}]",
        transform.rotation.angle(),
        transform.translation.x,
        transform.translation.y,
        transform.translation.z,
    );

    Ok(AlignedTrajectory {
        poses: estimate.iter().map(|p| transform.transform_pose(p)).collect(),
        transform,
        correspondences: n,
    })
}

/// `i`-th of `n` indices evenly spread over `0..len`, endpoints included.
fn spaced_index(i: usize, n: usize, len: usize) -> usize {
    if n <= 1 || len == 0 {
        return 0;
    }
    i * (len - 1) / (n - 1)
}
