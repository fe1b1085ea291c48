//! Dead-reckoning pose estimator.
//!
//! One entry point, two phases:
//!
//! ```text
//! Calibrating ──(calibration_count samples)──▶ Active
//! ```
//!
//! In the active phase each sample runs:
//! dt check → bias correction → stationary detection → attitude → kinematics
//! → `PoseRecord`.

use tracing::{debug, trace};

use super::attitude::AttitudeIntegrator;
use super::config::{ConfigError, EstimatorConfig};
use super::error::EstimatorError;
use super::kinematics::KinematicIntegrator;
use super::pose::PoseRecord;
use super::state::FilterState;
use crate::imu::{Calibration, CalibrationEstimator, GravityMode, InertialSample, StationaryDetector};

#[derive(Debug, Clone)]
enum Phase {
    Calibrating(CalibrationEstimator),
    Active {
        calibration: Calibration,
        filter: FilterState,
    },
}

/// Outcome of one active-phase sample.
enum Step {
    /// First sample after calibration; only the time base is set.
    TimeBaseInitialized,
    /// dt outside (0, dt_max]; only the time base advanced.
    Dropped { dt: f64 },
    Accepted(PoseRecord),
}

/// Single-stream IMU dead-reckoning estimator.
///
/// Not internally synchronized: a host sharing it across threads must
/// serialize calls (see `system::PosePipeline`).
#[derive(Debug, Clone)]
pub struct PoseEstimator {
    config: EstimatorConfig,
    attitude: AttitudeIntegrator,
    kinematics: KinematicIntegrator,
    phase: Phase,
    accepted: u64,
    dropped: u64,
}

impl PoseEstimator {
    pub fn new(config: EstimatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            attitude: AttitudeIntegrator::new(&config),
            kinematics: KinematicIntegrator::new(&config),
            phase: Phase::Calibrating(Self::calibrator(&config)),
            config,
            accepted: 0,
            dropped: 0,
        })
    }

    fn calibrator(config: &EstimatorConfig) -> CalibrationEstimator {
        CalibrationEstimator::new(
            config.calibration_count,
            config.gravity_present_threshold,
            config.gravity_magnitude,
        )
    }

    fn detector(config: &EstimatorConfig) -> StationaryDetector {
        StationaryDetector::new(
            config.zupt_window_size,
            config.zupt_min_window,
            config.zupt_gyro_thresh,
            config.zupt_accel_var_thresh,
        )
    }

    /// Feed one raw sample.
    ///
    /// Returns a pose for every accepted active-phase sample; `None` while
    /// calibrating, on the first active sample, and for samples whose dt is
    /// out of range.
    pub fn process(&mut self, sample: &InertialSample) -> Option<PoseRecord> {
        let step = match &mut self.phase {
            Phase::Calibrating(calib) => {
                if let Ok(Some(calibration)) = calib.ingest_calibration_sample(sample) {
                    self.activate(calibration);
                }
                return None;
            }
            Phase::Active {
                calibration,
                filter,
            } => Self::advance(
                &self.config,
                &self.attitude,
                &self.kinematics,
                calibration,
                filter,
                sample,
            ),
        };

        match step {
            Step::TimeBaseInitialized => None,
            Step::Dropped { dt } => {
                self.dropped += 1;
                debug!(dt, timestamp = sample.timestamp_s, "Dropping sample with out-of-range dt");
                None
            }
            Step::Accepted(pose) => {
                self.accepted += 1;
                self.log_status();
                Some(pose)
            }
        }
    }

    /// Offer a sample to the calibration window directly.
    ///
    /// Fails with `CalibrationReentry` once calibration has completed.
    pub fn ingest_calibration_sample(
        &mut self,
        sample: &InertialSample,
    ) -> Result<Option<Calibration>, EstimatorError> {
        let Phase::Calibrating(calib) = &mut self.phase else {
            return Err(EstimatorError::CalibrationReentry);
        };
        let result = calib.ingest_calibration_sample(sample)?;
        if let Some(calibration) = result {
            self.activate(calibration);
        }
        Ok(result)
    }

    fn activate(&mut self, calibration: Calibration) {
        let filter = FilterState::new(calibration.initial_orientation, Self::detector(&self.config));
        self.phase = Phase::Active {
            calibration,
            filter,
        };
    }

    fn advance(
        config: &EstimatorConfig,
        attitude: &AttitudeIntegrator,
        kinematics: &KinematicIntegrator,
        calibration: &Calibration,
        filter: &mut FilterState,
        sample: &InertialSample,
    ) -> Step {
        let Some(last) = filter.last_timestamp.replace(sample.timestamp_s) else {
            return Step::TimeBaseInitialized;
        };
        let dt = sample.timestamp_s - last;
        if !(dt > 0.0 && dt <= config.dt_max) {
            return Step::Dropped { dt };
        }

        let corrected = sample.corrected(&calibration.bias);
        let subtract_gravity = calibration.gravity_mode.subtracts_gravity();

        filter.detector.push(corrected);
        let stationary = filter.detector.is_stationary();
        filter.stationary = stationary;

        let update = attitude.update(
            &mut filter.orientation,
            &corrected.gyro,
            &corrected.accel,
            dt,
            subtract_gravity,
            stationary,
        );
        trace!(
            timestamp = sample.timestamp_s,
            propagated = update.propagated,
            leveled = update.leveled,
            stationary,
            "Attitude step"
        );

        kinematics.step(
            &filter.orientation,
            &mut filter.velocity,
            &mut filter.position,
            &corrected.accel,
            dt,
            subtract_gravity,
            stationary,
        );

        Step::Accepted(PoseRecord::new(
            sample.timestamp_s,
            filter.position,
            filter.orientation,
        ))
    }

    fn log_status(&self) {
        let interval = self.config.status_log_interval;
        if interval == 0 || self.accepted % interval != 0 {
            return;
        }
        if let Some(filter) = self.filter_state() {
            let p = filter.position;
            let v = filter.velocity;
            debug!(
                accepted = self.accepted,
                dropped = self.dropped,
                "Pos: [{:.2}, {:.2}, {:.2}] Vel: [{:.2}, {:.2}, {:.2}] Static: {}",
                p.x,
                p.y,
                p.z,
                v.x,
                v.y,
                v.z,
                if filter.stationary { "YES" } else { "NO" }
            );
        }
    }

    /// Discard calibration and motion state and start calibrating again.
    pub fn reset(&mut self) {
        self.phase = Phase::Calibrating(Self::calibrator(&self.config));
        self.accepted = 0;
        self.dropped = 0;
    }

    pub fn is_calibrated(&self) -> bool {
        matches!(self.phase, Phase::Active { .. })
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        match &self.phase {
            Phase::Active { calibration, .. } => Some(calibration),
            Phase::Calibrating(_) => None,
        }
    }

    /// Samples still needed before calibration completes.
    pub fn calibration_remaining(&self) -> usize {
        match &self.phase {
            Phase::Calibrating(calib) => calib.target_samples() - calib.sample_count(),
            Phase::Active { .. } => 0,
        }
    }

    pub fn filter_state(&self) -> Option<&FilterState> {
        match &self.phase {
            Phase::Active { filter, .. } => Some(filter),
            Phase::Calibrating(_) => None,
        }
    }

    pub fn gravity_mode(&self) -> Option<GravityMode> {
        self.calibration().map(|c| c.gravity_mode)
    }

    /// Stationary classification of the latest accepted sample.
    pub fn is_stationary(&self) -> bool {
        self.filter_state().is_some_and(|f| f.stationary)
    }

    /// Latest pose, if active.
    pub fn current_pose(&self) -> Option<PoseRecord> {
        self.filter_state().and_then(|f| {
            f.last_timestamp
                .map(|t| PoseRecord::new(t, f.position, f.orientation))
        })
    }

    pub fn accepted_samples(&self) -> u64 {
        self.accepted
    }

    pub fn dropped_samples(&self) -> u64 {
        self.dropped
    }
}
