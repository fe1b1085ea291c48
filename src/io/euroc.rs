//! EuRoC MAV dataset readers.
//!
//! Only the two CSV streams the estimator needs are read:
//! `imu0/data.csv` and `state_groundtruth_estimate0/data.csv`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, StringRecord};
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use tracing::{info, warn};

use crate::estimator::PoseRecord;
use crate::imu::InertialSample;

const NS_TO_S: f64 = 1e-9;

/// Paths of one EuRoC sequence (e.g. `MH_01_easy/mav0`).
#[derive(Debug, Clone)]
pub struct EurocSequence {
    root: PathBuf,
}

impl EurocSequence {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.join("imu0/data.csv").is_file() {
            bail!("{} has no imu0/data.csv", root.display());
        }
        Ok(Self { root })
    }

    pub fn imu_samples(&self) -> Result<Vec<InertialSample>> {
        load_imu_csv(self.root.join("imu0/data.csv"))
    }

    /// Ground truth is optional; a missing file yields an empty trajectory.
    pub fn groundtruth(&self) -> Vec<PoseRecord> {
        load_groundtruth_csv(self.root.join("state_groundtruth_estimate0/data.csv"))
            .unwrap_or_else(|e| {
                warn!("Could not load ground truth: {:#}. Continuing without it.", e);
                Vec::new()
            })
    }
}

/// Read an IMU CSV: `timestamp_ns, wx, wy, wz, ax, ay, az`.
///
/// `#` lines are comments and short rows are skipped. Timestamps are
/// converted from nanoseconds to seconds.
pub fn load_imu_csv<P: AsRef<Path>>(csv_path: P) -> Result<Vec<InertialSample>> {
    let csv_path = csv_path.as_ref();
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .from_path(csv_path)
        .with_context(|| format!("Failed to open {}", csv_path.display()))?;

    let mut samples = Vec::new();
    let mut skipped = 0usize;
    for (line, rec) in rdr.records().enumerate() {
        let rec = rec?;
        if rec.len() < 7 {
            skipped += 1;
            continue;
        }
        let ts = rec[0]
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{}: bad timestamp on record {}", csv_path.display(), line + 1))?;
        let gyro = vector_at(&rec, 1)?;
        let accel = vector_at(&rec, 4)?;
        samples.push(InertialSample::new(ts as f64 * NS_TO_S, gyro, accel));
    }

    if skipped > 0 {
        warn!(skipped, "Skipped short rows in {}", csv_path.display());
    }
    info!(samples = samples.len(), "Loaded IMU stream from {}", csv_path.display());
    Ok(samples)
}

/// Read EuRoC ground truth:
/// `timestamp_ns, px, py, pz, qw, qx, qy, qz, ...` (velocity and biases ignored).
pub fn load_groundtruth_csv<P: AsRef<Path>>(csv_path: P) -> Result<Vec<PoseRecord>> {
    let csv_path = csv_path.as_ref();
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .from_path(csv_path)
        .with_context(|| format!("Failed to open {}", csv_path.display()))?;

    let mut poses = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        if rec.len() < 8 {
            continue;
        }
        let ts: u64 = rec[0].trim().parse()?;
        let position = vector_at(&rec, 1)?;
        // w-first
        let orientation = UnitQuaternion::from_quaternion(Quaternion::new(
            rec[4].trim().parse()?,
            rec[5].trim().parse()?,
            rec[6].trim().parse()?,
            rec[7].trim().parse()?,
        ));
        poses.push(PoseRecord::new(ts as f64 * NS_TO_S, position, orientation));
    }
    Ok(poses)
}

fn vector_at(rec: &StringRecord, start: usize) -> Result<Vector3<f64>> {
    Ok(Vector3::new(
        rec[start].trim().parse()?,
        rec[start + 1].trim().parse()?,
        rec[start + 2].trim().parse()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::fs;

    const IMU_CSV: &str = "\
#timestamp [ns],w_RS_S_x [rad s^-1],w_RS_S_y [rad s^-1],w_RS_S_z [rad s^-1],a_RS_S_x [m s^-2],a_RS_S_y [m s^-2],a_RS_S_z [m s^-2]
1403636579758555392,-0.099134701513277898,0.14032447186034408,0.029321531433504062,8.1476917083333333,-0.37592158333333331,-2.4026292499999999
1403636579763555584,-0.099134701513277898,0.13404129850199794,0.037699761910965172,8.033280791666666,-0.40861041666666664,-2.4026292499999999
1403636579768555520,0.1,0.2
";

    #[test]
    fn test_load_imu_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, IMU_CSV).unwrap();

        let samples = load_imu_csv(&path).unwrap();

        assert_eq!(samples.len(), 2);
        assert_relative_eq!(samples[0].timestamp_s, 1403636579.758555392, epsilon = 1e-6);
        assert_relative_eq!(
            samples[1].timestamp_s - samples[0].timestamp_s,
            0.005,
            epsilon = 1e-5
        );
        assert_relative_eq!(samples[0].gyro.y, 0.14032447186034408, epsilon = 1e-15);
        assert_relative_eq!(samples[1].accel.x, 8.033280791666666, epsilon = 1e-15);
    }

    #[test]
    fn test_load_imu_csv_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_imu_csv(dir.path().join("nope.csv")).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to open"));
    }

    #[test]
    fn test_load_imu_csv_bad_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "1000,0,0,0,0,0,abc\n").unwrap();
        assert!(load_imu_csv(&path).is_err());
    }

    #[test]
    fn test_sequence_layout() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EurocSequence::new(dir.path()).is_err());

        fs::create_dir_all(dir.path().join("imu0")).unwrap();
        fs::write(dir.path().join("imu0/data.csv"), IMU_CSV).unwrap();
        fs::create_dir_all(dir.path().join("state_groundtruth_estimate0")).unwrap();
        fs::write(
            dir.path().join("state_groundtruth_estimate0/data.csv"),
            "#timestamp,p_x,p_y,p_z,q_w,q_x,q_y,q_z\n\
             1403636580838555648,4.688319,-1.786938,0.783338,0.534108,-0.153029,-0.827383,-0.082152\n",
        )
        .unwrap();

        let seq = EurocSequence::new(dir.path()).unwrap();
        assert_eq!(seq.imu_samples().unwrap().len(), 2);

        let gt = seq.groundtruth();
        assert_eq!(gt.len(), 1);
        assert_relative_eq!(gt[0].position, Vector3::new(4.688319, -1.786938, 0.783338));
        assert_relative_eq!(gt[0].orientation.norm(), 1.0, epsilon = 1e-12);
        assert!(gt[0].orientation.w > 0.5);
    }

    #[test]
    fn test_missing_groundtruth_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("imu0")).unwrap();
        fs::write(dir.path().join("imu0/data.csv"), IMU_CSV).unwrap();

        let seq = EurocSequence::new(dir.path()).unwrap();
        assert!(seq.groundtruth().is_empty());
    }
}
