use serde::Serialize;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::thresholds::CaptureThresholds;

/// Debounce counter plus the frame dimensions latched for the session.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CenteringState {
    pub centered_frames: u32,
    pub frame_width: f64,
    pub frame_height: f64,
}

impl CenteringState {
    pub fn clear(&mut self) {
        self.centered_frames = 0;
    }

    pub fn has_frame_dimensions(&self) -> bool {
        self.frame_width > 0.0 && self.frame_height > 0.0
    }

    /// Records the frame size the first time a usable one is seen.
    /// Returns whether the dimensions were set by this call.
    pub fn latch_frame_dimensions(&mut self, width: u32, height: u32) -> bool {
        if self.has_frame_dimensions() || width == 0 || height == 0 {
            return false;
        }
        self.frame_width = width as f64;
        self.frame_height = height as f64;
        true
    }
}

/// Decides whether the face sits near the middle of the frame, debounced so
/// one noisy detection does not flip the result.
pub struct CenteringEvaluator {
    threshold_x: f64,
    threshold_y: f64,
    min_centered_frames: u32,
}

impl CenteringEvaluator {
    pub fn new(threshold_x: f64, threshold_y: f64, min_centered_frames: u32) -> Self {
        Self {
            threshold_x,
            threshold_y,
            min_centered_frames,
        }
    }

    pub fn from_thresholds(thresholds: &CaptureThresholds) -> Self {
        Self::new(
            thresholds.center_threshold_x,
            thresholds.center_threshold_y,
            thresholds.min_centered_frames,
        )
    }

    /// Single-frame check. Unknown frame dimensions never count as centered.
    pub fn is_centered_in_frame(&self, bbox: &BoundingBox, frame_w: f64, frame_h: f64) -> bool {
        if frame_w <= 0.0 || frame_h <= 0.0 {
            return false;
        }
        let (cx, cy) = bbox.center();
        (cx - frame_w / 2.0).abs() <= frame_w * self.threshold_x
            && (cy - frame_h / 2.0).abs() <= frame_h * self.threshold_y
    }

    /// Updates the debounce counter and returns the debounced flag.
    pub fn observe(&self, state: &mut CenteringState, bbox: &BoundingBox) -> bool {
        if self.is_centered_in_frame(bbox, state.frame_width, state.frame_height) {
            state.centered_frames = (state.centered_frames + 1).min(self.min_centered_frames);
        } else {
            state.clear();
        }
        self.is_centered(state)
    }

    pub fn is_centered(&self, state: &CenteringState) -> bool {
        state.centered_frames >= self.min_centered_frames
    }
}
