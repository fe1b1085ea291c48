//! imu-pose: IMU-only dead reckoning from the command line.
//!
//! ```text
//! imu-pose run  <imu.csv | euroc/mav0> <out.tum> [--config estimator.toml]
//! imu-pose eval <estimate.tum> <groundtruth.tum | groundtruth.csv> [--aligned-out aligned.tum]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rust_imu_pose::estimator::{EstimatorConfig, PoseRecord};
use rust_imu_pose::eval::{
    align_trajectory, RangeErrors, TrajectoryMetrics, DEFAULT_MAX_PAIRS, DEFAULT_MAX_SAMPLES,
    DEFAULT_RANGE_PAIRS,
};
use rust_imu_pose::imu::InertialSample;
use rust_imu_pose::io::{load_groundtruth_csv, load_imu_csv, EurocSequence};
use rust_imu_pose::system::PosePipeline;
use rust_imu_pose::trajectory::{read_tum, write_tum};

const USAGE: &str = "usage:
  imu-pose run  <imu.csv | euroc/mav0> <out.tum> [--config estimator.toml]
  imu-pose eval <estimate.tum> <groundtruth.tum | groundtruth.csv> [--aligned-out aligned.tum]";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let positional: Vec<&str> = positional_args(&args);

    match positional.as_slice() {
        ["run", input, output] => {
            let config = match flag_value(&args, "--config") {
                Some(path) => {
                    info!("Loading configuration from {}", path);
                    EstimatorConfig::load(path)?
                }
                None => {
                    info!("Using default configuration");
                    EstimatorConfig::default()
                }
            };
            run(Path::new(input), Path::new(output), config)
        }
        ["eval", estimate, groundtruth] => {
            let aligned_out = flag_value(&args, "--aligned-out").map(PathBuf::from);
            let est_poses = read_tum(estimate)?;
            let gt_poses = load_reference(Path::new(groundtruth))?;
            evaluate(&est_poses, &gt_poses, aligned_out.as_deref())
        }
        _ => bail!("{USAGE}"),
    }
}

/// Arguments that are neither flags nor flag values.
fn positional_args(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg.starts_with("--") {
            iter.next();
        } else {
            out.push(arg.as_str());
        }
    }
    out
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn run(input: &Path, output: &Path, config: EstimatorConfig) -> Result<()> {
    let (samples, groundtruth) = if input.is_dir() {
        let sequence = EurocSequence::new(input)?;
        (sequence.imu_samples()?, sequence.groundtruth())
    } else {
        (load_imu_csv(input)?, Vec::new())
    };
    if samples.is_empty() {
        bail!("{} contains no IMU samples", input.display());
    }

    let poses = estimate(&samples, config)?;
    let written = write_tum(output, &poses)?;
    info!(poses = written, "Trajectory written to {}", output.display());

    if !groundtruth.is_empty() {
        evaluate(&poses, &groundtruth, None)?;
    }
    Ok(())
}

fn estimate(samples: &[InertialSample], config: EstimatorConfig) -> Result<Vec<PoseRecord>> {
    let mut pipeline = PosePipeline::spawn(config).context("Invalid estimator configuration")?;
    let mut poses = Vec::with_capacity(samples.len());

    for sample in samples {
        pipeline.submit(*sample)?;
        poses.extend(pipeline.poses().try_iter());
    }
    pipeline.shutdown();
    poses.extend(pipeline.poses().try_iter());

    let status = pipeline.status();
    info!(
        accepted = status.accepted,
        dropped = status.dropped,
        resets = status.resets,
        "Processed {} samples",
        samples.len()
    );
    if status.undelivered > 0 {
        warn!(undelivered = status.undelivered, "Some poses missed the output channel");
    }
    if let Some(latest) = status.latest {
        let p = latest.position;
        let path = pipeline.shared_state().path.read();
        info!(
            "Final position [{:.3}, {:.3}, {:.3}] m, path length {:.3} m (last {} poses)",
            p.x,
            p.y,
            p.z,
            path.total_length(),
            path.len(),
        );
    }
    Ok(poses)
}

fn load_reference(path: &Path) -> Result<Vec<PoseRecord>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => load_groundtruth_csv(path),
        _ => read_tum(path),
    }
}

fn evaluate(estimate: &[PoseRecord], groundtruth: &[PoseRecord], aligned_out: Option<&Path>) -> Result<()> {
    let aligned = align_trajectory(estimate, groundtruth, DEFAULT_MAX_SAMPLES)
        .context("Failed to align estimate with ground truth")?;
    let t = aligned.transform.translation;
    info!(
        correspondences = aligned.correspondences,
        "Alignment: rotation {:.2} deg, translation [{:.3}, {:.3}, {:.3}] m",
        aligned.transform.rotation.angle().to_degrees(),
        t.x,
        t.y,
        t.z,
    );

    let Some(metrics) = TrajectoryMetrics::compute(&aligned.poses, groundtruth, DEFAULT_MAX_PAIRS) else {
        bail!("No poses to compare");
    };
    info!(
        pairs = metrics.pairs,
        "ATE RMSE {:.4} m, mean {:.4} m, max {:.4} m",
        metrics.ate_rmse,
        metrics.ate_mean,
        metrics.ate_max,
    );
    match metrics.endpoint_error {
        Some(e) => info!("Loop closure (start to end) error {:.4} m", e),
        None => warn!("Estimate too short for loop closure error"),
    }

    // Ground truth start serves as the ranging anchor.
    if let Some(anchor) = groundtruth.first().map(|p| p.position) {
        if let Some(range) = RangeErrors::compute(&aligned.poses, groundtruth, &anchor, DEFAULT_RANGE_PAIRS) {
            info!(
                pairs = range.pairs,
                "Anchor range error mean {:.4} m, max {:.4} m",
                range.mean,
                range.max,
            );
        }
    }

    if let Some(path) = aligned_out {
        write_tum(path, &aligned.poses)?;
        info!("Aligned trajectory written to {}", path.display());
    }
    Ok(())
}
