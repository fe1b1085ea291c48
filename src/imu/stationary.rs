//! Zero-velocity (ZUPT) detection over a sliding window.
//!
//! The platform is classified as at rest when, over the most recent window of
//! bias-corrected samples, the mean gyro magnitude and the mean per-axis
//! accelerometer variance are both below their thresholds. Slow genuine motion
//! can be misread as rest and vice versa; there is no secondary check.

use std::collections::VecDeque;

use nalgebra::Vector3;

use super::sample::InertialSample;

/// Sliding-window stationary classifier.
#[derive(Debug, Clone)]
pub struct StationaryDetector {
    window: VecDeque<InertialSample>,
    capacity: usize,
    min_samples: usize,
    gyro_thresh: f64,
    accel_var_thresh: f64,
}

impl StationaryDetector {
    pub fn new(capacity: usize, min_samples: usize, gyro_thresh: f64, accel_var_thresh: f64) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            min_samples: min_samples.clamp(1, capacity),
            gyro_thresh,
            accel_var_thresh,
        }
    }

    /// Append a bias-corrected sample, evicting the oldest at capacity.
    pub fn push(&mut self, sample: InertialSample) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(sample);
    }

    pub fn is_stationary(&self) -> bool {
        if self.window.len() < self.min_samples {
            return false;
        }
        self.mean_gyro_magnitude() < self.gyro_thresh
            && self.mean_accel_variance() < self.accel_var_thresh
    }

    /// Mean of |ω| over the window (rad/s).
    pub fn mean_gyro_magnitude(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.window.iter().map(|s| s.gyro.norm()).sum();
        sum / self.window.len() as f64
    }

    /// Population variance of each accel axis, averaged over the three axes.
    pub fn mean_accel_variance(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let n = self.window.len() as f64;
        let mean = self
            .window
            .iter()
            .fold(Vector3::<f64>::zeros(), |acc, s| acc + s.accel)
            / n;
        let var = self.window.iter().fold(Vector3::<f64>::zeros(), |acc, s| {
            let d = s.accel - mean;
            acc + d.component_mul(&d)
        }) / n;
        var.mean()
    }

    /// Samples currently in the window.
    pub fn filled(&self) -> usize {
        self.window.len()
    }
}
