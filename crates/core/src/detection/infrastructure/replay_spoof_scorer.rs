use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::detection::domain::spoof_scorer::{RawSpoofResult, SpoofScorer};
use crate::detection::infrastructure::replay_face_detector::ReplayError;
use crate::shared::frame::Frame;

/// Replays recorded anti-spoof results by frame index.
///
/// Frames without an entry produce `Ok(None)`, the same as a model that
/// returned nothing for the crop.
pub struct ReplaySpoofScorer {
    cache: Arc<HashMap<usize, RawSpoofResult>>,
    failures: HashSet<usize>,
    available: bool,
}

impl ReplaySpoofScorer {
    pub fn new(cache: Arc<HashMap<usize, RawSpoofResult>>) -> Self {
        Self {
            cache,
            failures: HashSet::new(),
            available: true,
        }
    }

    pub fn with_failures(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.failures.extend(indices);
        self
    }

    /// Simulates a device where the anti-spoof model failed to load.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}

impl SpoofScorer for ReplaySpoofScorer {
    fn score(
        &mut self,
        frame: &Frame,
    ) -> Result<Option<RawSpoofResult>, Box<dyn std::error::Error>> {
        if self.failures.contains(&frame.index()) {
            return Err(Box::new(ReplayError {
                stage: "anti-spoof",
                index: frame.index(),
            }));
        }
        Ok(self.cache.get(&frame.index()).copied())
    }

    fn is_available(&self) -> bool {
        self.available
    }
}
