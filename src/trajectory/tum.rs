//! TUM RGB-D trajectory format.
//!
//! One pose per line: `timestamp tx ty tz qx qy qz qw`, whitespace
//! separated, `#` for comments.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use tracing::debug;

use crate::estimator::PoseRecord;

const FIELDS: usize = 8;

/// Format one pose as a TUM line (no newline).
pub fn format_tum_line(pose: &PoseRecord) -> String {
    let p = &pose.position;
    let q = pose.orientation.quaternion();
    format!(
        "{:.9} {:.9} {:.9} {:.9} {:.9} {:.9} {:.9} {:.9}",
        pose.timestamp_s, p.x, p.y, p.z, q.i, q.j, q.k, q.w
    )
}

pub fn write_tum<'a, P, I>(path: P, poses: I) -> Result<usize>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a PoseRecord>,
{
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "# timestamp tx ty tz qx qy qz qw")?;
    let mut count = 0;
    for pose in poses {
        writeln!(out, "{}", format_tum_line(pose))?;
        count += 1;
    }
    out.flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;

    debug!(poses = count, "Wrote TUM trajectory to {}", path.display());
    Ok(count)
}

/// Read a TUM trajectory. Lines with fewer than eight fields are skipped.
pub fn read_tum<P: AsRef<Path>>(path: P) -> Result<Vec<PoseRecord>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let mut poses = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < FIELDS {
            continue;
        }
        let pose = parse_fields(&fields)
            .with_context(|| format!("{}:{}: malformed pose", path.display(), idx + 1))?;
        poses.push(pose);
    }
    Ok(poses)
}

fn parse_fields(fields: &[&str]) -> Result<PoseRecord> {
    let mut v = [0.0f64; FIELDS];
    for (slot, field) in v.iter_mut().zip(fields) {
        *slot = field.parse()?;
    }
    let [t, x, y, z, qx, qy, qz, qw] = v;
    Ok(PoseRecord::new(
        t,
        Vector3::new(x, y, z),
        UnitQuaternion::from_quaternion(Quaternion::new(qw, qx, qy, qz)),
    ))
}
