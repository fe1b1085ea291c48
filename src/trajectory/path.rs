use std::collections::VecDeque;

use crate::estimator::PoseRecord;

/// Poses kept for display unless configured otherwise.
pub const DEFAULT_PATH_CAPACITY: usize = 1000;

/// Bounded history of recent poses; the oldest pose is evicted when full.
#[derive(Debug, Clone)]
pub struct PathBuffer {
    poses: VecDeque<PoseRecord>,
    capacity: usize,
}

impl PathBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            poses: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, pose: PoseRecord) {
        if self.poses.len() == self.capacity {
            self.poses.pop_front();
        }
        self.poses.push_back(pose);
    }

    pub fn latest(&self) -> Option<&PoseRecord> {
        self.poses.back()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PoseRecord> {
        self.poses.iter()
    }

    pub fn to_vec(&self) -> Vec<PoseRecord> {
        self.poses.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.poses.clear();
    }

    /// Sum of distances between consecutive retained positions (m).
    pub fn total_length(&self) -> f64 {
        self.poses
            .iter()
            .zip(self.poses.iter().skip(1))
            .map(|(a, b)| (b.position - a.position).norm())
            .sum()
    }
}

impl Default for PathBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_PATH_CAPACITY)
    }
}

impl Extend<PoseRecord> for PathBuffer {
    fn extend<I: IntoIterator<Item = PoseRecord>>(&mut self, iter: I) {
        for pose in iter {
            self.push(pose);
        }
    }
}
