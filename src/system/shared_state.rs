//! State published by the estimator thread for readers on other threads.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::estimator::PoseRecord;
use crate::trajectory::PathBuffer;

/// Snapshot of estimator progress, refreshed after every sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PipelineStatus {
    pub calibrated: bool,
    pub stationary: bool,
    pub accepted: u64,
    pub dropped: u64,
    /// Poses not delivered because the output channel was full.
    pub undelivered: u64,
    pub resets: u64,
    pub latest: Option<PoseRecord>,
}

/// Written only by the estimator thread; read by anyone.
pub struct SharedPoseState {
    pub path: RwLock<PathBuffer>,
    pub status: RwLock<PipelineStatus>,
}

impl SharedPoseState {
    pub fn new(path_capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            path: RwLock::new(PathBuffer::new(path_capacity)),
            status: RwLock::new(PipelineStatus::default()),
        })
    }

    pub fn path_snapshot(&self) -> Vec<PoseRecord> {
        self.path.read().to_vec()
    }

    pub fn status(&self) -> PipelineStatus {
        *self.status.read()
    }
}
