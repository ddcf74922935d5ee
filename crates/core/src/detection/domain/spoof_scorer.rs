use serde::{Deserialize, Serialize};

use crate::shared::frame::Frame;

/// Raw per-frame output of the anti-spoof model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSpoofResult {
    /// Laplacian sharpness of the face crop; replayed screens and prints blur it.
    pub laplacian_score: f64,
    /// Model confidence that the face is live, in `[0, 1]`.
    pub confidence: f64,
    /// Fused sharpness/model score, in `[0, 1]`.
    pub combined_score: f64,
}

/// Domain interface for the anti-spoof scorer.
///
/// Only invoked on demand (when a single centered face is present), at most
/// once per frame. `Ok(None)` means the scorer produced nothing usable.
pub trait SpoofScorer: Send {
    fn score(
        &mut self,
        frame: &Frame,
    ) -> Result<Option<RawSpoofResult>, Box<dyn std::error::Error>>;

    /// Scorers backed by an optional native model report whether it loaded.
    fn is_available(&self) -> bool {
        true
    }
}
