//! Estimator tuning parameters.
//!
//! Every threshold and damping constant used by the calibration, stationary
//! detection, attitude and kinematic stages lives here so it can be
//! overridden from a TOML file:
//!
//! ```toml
//! calibration_count = 400
//! zupt_gyro_thresh = 0.03
//! velocity_leak = 0.999
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::so3::SMALL_ANGLE_THRESHOLD;
use crate::imu::GRAVITY_MAGNITUDE;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid parameter `{name}`: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Dead-reckoning estimator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Number of raw samples collected before biases are frozen.
    pub calibration_count: usize,
    /// Mean accel norm (m/s^2) above which the stream is taken to include gravity.
    pub gravity_present_threshold: f64,
    /// Gravity magnitude (m/s^2) used for bias expectation and world-frame removal.
    pub gravity_magnitude: f64,

    /// Mean gyro magnitude (rad/s) below which the platform may be at rest.
    pub zupt_gyro_thresh: f64,
    /// Mean per-axis accel variance ((m/s^2)^2) below which the platform may be at rest.
    pub zupt_accel_var_thresh: f64,
    /// Stationary detector window capacity.
    pub zupt_window_size: usize,
    /// Minimum filled entries before classification is attempted.
    pub zupt_min_window: usize,

    /// Gyro weight of the roll/pitch blend while moving.
    pub complementary_alpha_normal: f64,
    /// Gyro weight of the roll/pitch blend while at rest.
    pub complementary_alpha_stationary: f64,
    /// Lower bound (inclusive) of the accel norm gate for leveling.
    pub leveling_accel_min: f64,
    /// Upper bound (inclusive) of the accel norm gate for leveling.
    pub leveling_accel_max: f64,
    /// Rotation increments at or below this angle (rad) are skipped.
    pub min_rotation_angle: f64,

    /// Largest accepted gap between consecutive samples (s).
    pub dt_max: f64,
    /// Per-sample velocity multiplier, always applied.
    pub velocity_leak: f64,
    /// Velocity multiplier applied while at rest.
    pub stationary_velocity_decay: f64,
    /// World acceleration multiplier applied while at rest.
    pub stationary_accel_suppression: f64,

    /// Accepted samples between status log lines (0 disables).
    pub status_log_interval: u64,
    /// Number of poses retained in path history.
    pub path_capacity: usize,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            calibration_count: 200,
            gravity_present_threshold: 7.0,
            gravity_magnitude: GRAVITY_MAGNITUDE,
            zupt_gyro_thresh: 0.05,
            zupt_accel_var_thresh: 0.5,
            zupt_window_size: 20,
            zupt_min_window: 10,
            complementary_alpha_normal: 0.98,
            complementary_alpha_stationary: 0.90,
            leveling_accel_min: 8.0,
            leveling_accel_max: 11.0,
            min_rotation_angle: SMALL_ANGLE_THRESHOLD,
            dt_max: 0.1,
            velocity_leak: 0.995,
            stationary_velocity_decay: 0.5,
            stationary_accel_suppression: 0.1,
            status_log_interval: 100,
            path_capacity: 1000,
        }
    }
}

impl EstimatorConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Reject parameter combinations the estimator cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.calibration_count == 0 {
            return Err(invalid("calibration_count", "must be at least 1"));
        }
        if self.zupt_window_size == 0 {
            return Err(invalid("zupt_window_size", "must be at least 1"));
        }
        if self.zupt_min_window == 0 || self.zupt_min_window > self.zupt_window_size {
            return Err(invalid(
                "zupt_min_window",
                format!(
                    "must be in 1..={} (zupt_window_size), got {}",
                    self.zupt_window_size, self.zupt_min_window
                ),
            ));
        }
        if self.dt_max.is_nan() || self.dt_max <= 0.0 {
            return Err(invalid("dt_max", format!("must be positive, got {}", self.dt_max)));
        }
        for (name, value) in [
            ("complementary_alpha_normal", self.complementary_alpha_normal),
            ("complementary_alpha_stationary", self.complementary_alpha_stationary),
            ("velocity_leak", self.velocity_leak),
            ("stationary_velocity_decay", self.stationary_velocity_decay),
            ("stationary_accel_suppression", self.stationary_accel_suppression),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(name, format!("must be in [0, 1], got {}", value)));
            }
        }
        if self.leveling_accel_min > self.leveling_accel_max {
            return Err(invalid(
                "leveling_accel_min",
                format!(
                    "{} exceeds leveling_accel_max {}",
                    self.leveling_accel_min, self.leveling_accel_max
                ),
            ));
        }
        if self.gravity_magnitude <= 0.0 {
            return Err(invalid("gravity_magnitude", "must be positive"));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EstimatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.calibration_count, 200);
        assert_eq!(config.zupt_window_size, 20);
        assert_eq!(config.zupt_min_window, 10);
        assert_eq!(config.velocity_leak, 0.995);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EstimatorConfig::from_toml_str(
            "calibration_count = 50\nvelocity_leak = 1.0\n",
        )
        .unwrap();

        assert_eq!(config.calibration_count, 50);
        assert_eq!(config.velocity_leak, 1.0);
        assert_eq!(config.dt_max, 0.1);
        assert_eq!(config.complementary_alpha_normal, 0.98);
    }

    #[test]
    fn test_rejects_min_window_above_capacity() {
        let err = EstimatorConfig::from_toml_str("zupt_window_size = 5\nzupt_min_window = 6\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "zupt_min_window", .. }));
    }

    #[test]
    fn test_rejects_alpha_out_of_range() {
        let config = EstimatorConfig {
            complementary_alpha_normal: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { name: "complementary_alpha_normal", .. })
        ));
    }

    #[test]
    fn test_bundled_config_matches_defaults() {
        let config = EstimatorConfig::from_toml_str(include_str!("../../estimator.toml")).unwrap();
        assert_eq!(config, EstimatorConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("estimator.toml");
        std::fs::write(&path, "zupt_gyro_thresh = 0.02\n").unwrap();

        let config = EstimatorConfig::load(&path).unwrap();
        assert_eq!(config.zupt_gyro_thresh, 0.02);

        let missing = EstimatorConfig::load(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(matches!(
            EstimatorConfig::from_toml_str("dt_max = \"fast\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
