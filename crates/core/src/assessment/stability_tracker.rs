use serde::Serialize;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::thresholds::CaptureThresholds;

/// Last accepted face box and how many consecutive frames it held still.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TrackingState {
    pub last_box: Option<BoundingBox>,
    pub stable_count: u32,
}

impl TrackingState {
    /// A face that moved is still a face: tracking restarts at one.
    pub fn restart(&mut self) {
        self.stable_count = 1;
    }

    /// No usable face this frame: back to the empty baseline.
    ///
    /// The last box is kept so the next detection is still compared
    /// against where the face was last seen.
    pub fn clear(&mut self) {
        self.stable_count = 0;
    }
}

/// Estimates whether a single face is holding still across frames.
pub struct StabilityTracker {
    movement_threshold: f64,
    stability_threshold: u32,
}

impl StabilityTracker {
    pub fn new(movement_threshold: f64, stability_threshold: u32) -> Self {
        Self {
            movement_threshold,
            stability_threshold,
        }
    }

    pub fn from_thresholds(thresholds: &CaptureThresholds) -> Self {
        Self::new(
            thresholds.movement_threshold,
            thresholds.stability_threshold,
        )
    }

    /// Folds the current box into the tracking state and returns the new
    /// stability count.
    pub fn observe(&self, state: &mut TrackingState, bbox: BoundingBox) -> u32 {
        match state.last_box {
            Some(previous) if bbox.moved_less_than(&previous, self.movement_threshold) => {
                state.stable_count = (state.stable_count + 1).min(self.stability_threshold);
            }
            _ => state.restart(),
        }
        state.last_box = Some(bbox);
        state.stable_count
    }

    pub fn is_stable(&self, state: &TrackingState) -> bool {
        state.stable_count >= self.stability_threshold
    }

    /// Hold-still progress shown to the user, 0-100.
    pub fn progress_percent(&self, state: &TrackingState) -> f64 {
        (state.stable_count as f64 / self.stability_threshold as f64 * 100.0).min(100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn at(x: f64, y: f64) -> BoundingBox {
        BoundingBox::new(x, y, 120.0, 150.0)
    }

    #[test]
    fn test_first_detection_starts_at_one() {
        let tracker = StabilityTracker::new(15.0, 3);
        let mut state = TrackingState::default();

        assert_eq!(tracker.observe(&mut state, at(100.0, 100.0)), 1);
        assert_eq!(state.last_box, Some(at(100.0, 100.0)));
    }

    #[test]
    fn test_still_face_counts_up_then_saturates() {
        let tracker = StabilityTracker::new(15.0, 3);
        let mut state = TrackingState::default();

        let counts: Vec<u32> = [0.0, 2.0, 4.0, 6.0, 8.0, 10.0]
            .iter()
            .map(|dx| tracker.observe(&mut state, at(100.0 + dx, 100.0)))
            .collect();

        assert_eq!(counts, vec![1, 2, 3, 3, 3, 3]);
        assert!(tracker.is_stable(&state));
    }

    #[test]
    fn test_movement_restarts_at_one_not_zero() {
        let tracker = StabilityTracker::new(15.0, 3);
        let mut state = TrackingState::default();
        for _ in 0..3 {
            tracker.observe(&mut state, at(100.0, 100.0));
        }

        assert_eq!(tracker.observe(&mut state, at(100.0, 130.0)), 1);
        assert!(!tracker.is_stable(&state));
    }

    #[test]
    fn test_comparison_uses_last_accepted_box() {
        // Slow drift: every step is within threshold of the previous box,
        // even though the total drift is large.
        let tracker = StabilityTracker::new(15.0, 5);
        let mut state = TrackingState::default();
        for i in 0..5 {
            tracker.observe(&mut state, at(100.0 + 10.0 * i as f64, 100.0));
        }
        assert_eq!(state.stable_count, 5);
    }

    #[test]
    fn test_clear_keeps_last_box() {
        let tracker = StabilityTracker::new(15.0, 3);
        let mut state = TrackingState::default();
        tracker.observe(&mut state, at(100.0, 100.0));
        tracker.observe(&mut state, at(100.0, 100.0));

        state.clear();

        assert_eq!(state.stable_count, 0);
        assert_eq!(state.last_box, Some(at(100.0, 100.0)));
        // Reappearing in place counts from the cleared baseline.
        assert_eq!(tracker.observe(&mut state, at(101.0, 100.0)), 1);
    }

    #[test]
    fn test_progress_percent() {
        let tracker = StabilityTracker::new(15.0, 3);
        let mut state = TrackingState::default();
        assert_relative_eq!(tracker.progress_percent(&state), 0.0);

        tracker.observe(&mut state, at(0.0, 0.0));
        assert_relative_eq!(tracker.progress_percent(&state), 100.0 / 3.0);

        tracker.observe(&mut state, at(0.0, 0.0));
        tracker.observe(&mut state, at(0.0, 0.0));
        assert_relative_eq!(tracker.progress_percent(&state), 100.0);
    }
}
