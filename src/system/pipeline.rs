//! Threaded pose pipeline.
//!
//! One worker thread owns the `PoseEstimator`, so samples are processed
//! strictly in submission order and the estimator itself needs no locking.
//! Callers feed a bounded input channel; poses come back on a bounded output
//! channel and are mirrored into a shared path history.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::messages::PipelineCommand;
use super::shared_state::{PipelineStatus, SharedPoseState};
use crate::estimator::{ConfigError, EstimatorConfig, PoseEstimator, PoseRecord};
use crate::imu::InertialSample;

/// Capacity of the sample channel. `submit` blocks while it is full.
const INPUT_CHANNEL_CAPACITY: usize = 256;
/// Capacity of the pose channel. Poses are dropped from the channel (not
/// from the path history) while it is full.
const OUTPUT_CHANNEL_CAPACITY: usize = 4096;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineError {
    #[error("pose pipeline has shut down")]
    Closed,
}

pub struct PosePipeline {
    shared: Arc<SharedPoseState>,
    input: Option<Sender<PipelineCommand>>,
    poses: Receiver<PoseRecord>,
    worker: Option<JoinHandle<()>>,
}

impl PosePipeline {
    /// Validate `config` and start the worker thread.
    pub fn spawn(config: EstimatorConfig) -> Result<Self, ConfigError> {
        let shared = SharedPoseState::new(config.path_capacity);
        let estimator = PoseEstimator::new(config)?;

        let (input, input_rx) = bounded::<PipelineCommand>(INPUT_CHANNEL_CAPACITY);
        let (pose_tx, poses) = bounded::<PoseRecord>(OUTPUT_CHANNEL_CAPACITY);

        let worker_shared = Arc::clone(&shared);
        let worker = thread::spawn(move || {
            let mut worker = PipelineWorker {
                estimator,
                shared: worker_shared,
                poses: pose_tx,
            };
            worker.run(input_rx);
        });

        Ok(Self {
            shared,
            input: Some(input),
            poses,
            worker: Some(worker),
        })
    }

    /// Queue one sample. Blocks while the input channel is full.
    pub fn submit(&self, sample: InertialSample) -> Result<(), PipelineError> {
        self.send(PipelineCommand::Sample(sample))
    }

    /// Queue a reset behind any samples already submitted.
    pub fn reset(&self) -> Result<(), PipelineError> {
        self.send(PipelineCommand::Reset)
    }

    fn send(&self, cmd: PipelineCommand) -> Result<(), PipelineError> {
        let input = self.input.as_ref().ok_or(PipelineError::Closed)?;
        input.send(cmd).map_err(|_| PipelineError::Closed)
    }

    /// Poses in emission order. Remains readable after `shutdown`.
    pub fn poses(&self) -> &Receiver<PoseRecord> {
        &self.poses
    }

    /// Copy of the recent path history, oldest first.
    pub fn path_snapshot(&self) -> Vec<PoseRecord> {
        self.shared.path_snapshot()
    }

    pub fn status(&self) -> PipelineStatus {
        self.shared.status()
    }

    pub fn shared_state(&self) -> &Arc<SharedPoseState> {
        &self.shared
    }

    /// Close the input, let the worker drain queued samples, and join it.
    pub fn shutdown(&mut self) {
        // Dropping the only sender ends the worker's receive loop.
        self.input.take();
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("Pose pipeline worker panicked");
            }
        }
    }
}

impl Drop for PosePipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct PipelineWorker {
    estimator: PoseEstimator,
    shared: Arc<SharedPoseState>,
    poses: Sender<PoseRecord>,
}

impl PipelineWorker {
    fn run(&mut self, commands: Receiver<PipelineCommand>) {
        while let Ok(cmd) = commands.recv() {
            match cmd {
                PipelineCommand::Sample(sample) => self.process(&sample),
                PipelineCommand::Reset => self.reset(),
            }
        }
        let status = self.shared.status();
        info!(
            accepted = status.accepted,
            dropped = status.dropped,
            undelivered = status.undelivered,
            "Pose pipeline stopped"
        );
    }

    fn process(&mut self, sample: &InertialSample) {
        let pose = self.estimator.process(sample);

        if let Some(pose) = pose {
            if !pose.is_finite() {
                warn!(
                    timestamp = pose.timestamp_s,
                    "Non-finite pose; restarting calibration"
                );
                self.reset();
                return;
            }
            self.shared.path.write().push(pose);
            match self.poses.try_send(pose) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.shared.status.write().undelivered += 1;
                }
                // Receiver lives in the pipeline handle; nothing left to deliver to.
                Err(TrySendError::Disconnected(_)) => {}
            }
        }

        let mut status = self.shared.status.write();
        status.calibrated = self.estimator.is_calibrated();
        status.stationary = self.estimator.is_stationary();
        status.accepted = self.estimator.accepted_samples();
        status.dropped = self.estimator.dropped_samples();
        if pose.is_some() {
            status.latest = pose;
        }
    }

    fn reset(&mut self) {
        self.estimator.reset();
        self.shared.path.write().clear();
        let mut status = self.shared.status.write();
        *status = PipelineStatus {
            resets: status.resets + 1,
            undelivered: status.undelivered,
            ..PipelineStatus::default()
        };
        debug!(resets = status.resets, "Estimator reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    const DT: f64 = 0.01;

    fn small_config() -> EstimatorConfig {
        EstimatorConfig {
            calibration_count: 10,
            path_capacity: 50,
            ..EstimatorConfig::default()
        }
    }

    fn at_rest(k: usize) -> InertialSample {
        InertialSample::new(k as f64 * DT, Vector3::zeros(), Vector3::new(0.0, 0.0, 9.81))
    }

    #[test]
    fn test_poses_in_submission_order() {
        let mut pipeline = PosePipeline::spawn(small_config()).unwrap();
        for k in 0..100 {
            pipeline.submit(at_rest(k)).unwrap();
        }
        pipeline.shutdown();

        // 10 calibration samples, one time-base sample, then one pose each.
        let poses: Vec<PoseRecord> = pipeline.poses().try_iter().collect();
        assert_eq!(poses.len(), 89);
        assert!(poses.windows(2).all(|w| w[0].timestamp_s < w[1].timestamp_s));
        assert_relative_eq!(poses[0].timestamp_s, 11.0 * DT, epsilon = 1e-12);

        let status = pipeline.status();
        assert!(status.calibrated);
        assert_eq!(status.accepted, 89);
        assert_eq!(status.latest, poses.last().copied());
    }

    #[test]
    fn test_path_snapshot_is_bounded() {
        let mut pipeline = PosePipeline::spawn(small_config()).unwrap();
        for k in 0..200 {
            pipeline.submit(at_rest(k)).unwrap();
        }
        pipeline.shutdown();

        let path = pipeline.path_snapshot();
        assert_eq!(path.len(), 50);
        assert_relative_eq!(path[49].timestamp_s, 199.0 * DT, epsilon = 1e-12);
    }

    #[test]
    fn test_reset_restarts_calibration() {
        let mut pipeline = PosePipeline::spawn(small_config()).unwrap();
        for k in 0..30 {
            pipeline.submit(at_rest(k)).unwrap();
        }
        pipeline.reset().unwrap();
        for k in 30..35 {
            pipeline.submit(at_rest(k)).unwrap();
        }
        pipeline.shutdown();

        let status = pipeline.status();
        assert_eq!(status.resets, 1);
        assert!(!status.calibrated);
        assert!(pipeline.path_snapshot().is_empty());
    }

    #[test]
    fn test_non_finite_pose_resets_pipeline() {
        let mut pipeline = PosePipeline::spawn(small_config()).unwrap();
        for k in 0..20 {
            pipeline.submit(at_rest(k)).unwrap();
        }
        let corrupt = InertialSample::new(20.0 * DT, Vector3::zeros(), Vector3::new(f64::NAN, 0.0, 9.81));
        pipeline.submit(corrupt).unwrap();
        pipeline.shutdown();

        let status = pipeline.status();
        assert_eq!(status.resets, 1);
        assert!(!status.calibrated);
        assert_eq!(status.latest, None);
        assert!(pipeline.path_snapshot().is_empty());
        // Only the 9 poses before the corrupt sample were delivered.
        let poses: Vec<PoseRecord> = pipeline.poses().try_iter().collect();
        assert_eq!(poses.len(), 9);
        assert!(poses.iter().all(PoseRecord::is_finite));
    }

    #[test]
    fn test_full_output_channel_counts_undelivered() {
        let mut pipeline = PosePipeline::spawn(small_config()).unwrap();
        let total = OUTPUT_CHANNEL_CAPACITY + 111;
        for k in 0..total {
            pipeline.submit(at_rest(k)).unwrap();
        }
        pipeline.shutdown();

        // Nothing was drained, so everything past capacity missed the channel.
        let emitted = total - 11;
        let status = pipeline.status();
        assert_eq!(status.accepted as usize, emitted);
        assert_eq!(status.undelivered as usize, emitted - OUTPUT_CHANNEL_CAPACITY);
        assert_eq!(pipeline.poses().len(), OUTPUT_CHANNEL_CAPACITY);

        // The path history still saw every pose.
        let path = pipeline.path_snapshot();
        assert_eq!(path.len(), 50);
        assert_relative_eq!(path[49].timestamp_s, (total - 1) as f64 * DT, epsilon = 1e-9);
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let mut pipeline = PosePipeline::spawn(small_config()).unwrap();
        pipeline.shutdown();
        assert_eq!(pipeline.submit(at_rest(0)), Err(PipelineError::Closed));
        // Second shutdown is a no-op.
        pipeline.shutdown();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EstimatorConfig {
            zupt_min_window: 100,
            zupt_window_size: 10,
            ..EstimatorConfig::default()
        };
        assert!(PosePipeline::spawn(config).is_err());
    }
}
