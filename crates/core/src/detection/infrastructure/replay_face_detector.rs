use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;

use crate::detection::domain::face_detector::{DetectedFace, FaceDetector};
use crate::shared::frame::Frame;

#[derive(Debug, Error)]
#[error("recorded {stage} failure at frame {index}")]
pub struct ReplayError {
    pub stage: &'static str,
    pub index: usize,
}

/// Replays recorded detection results by frame index.
///
/// Used to drive the capture pipeline from a trace captured on a device, so
/// gating decisions can be reproduced off-device. Frames without an entry
/// yield no faces; indices marked as failures reproduce a detector error.
pub struct ReplayFaceDetector {
    cache: Arc<HashMap<usize, Vec<DetectedFace>>>,
    failures: HashSet<usize>,
}

impl ReplayFaceDetector {
    pub fn new(cache: Arc<HashMap<usize, Vec<DetectedFace>>>) -> Self {
        Self {
            cache,
            failures: HashSet::new(),
        }
    }

    pub fn with_failures(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.failures.extend(indices);
        self
    }
}

impl FaceDetector for ReplayFaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>> {
        if self.failures.contains(&frame.index()) {
            return Err(Box::new(ReplayError {
                stage: "detector",
                index: frame.index(),
            }));
        }
        Ok(self.cache.get(&frame.index()).cloned().unwrap_or_default())
    }
}
