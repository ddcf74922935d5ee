use serde::Serialize;

use crate::detection::domain::face_detector::DetectedFace;
use crate::shared::thresholds::{CaptureThresholds, LivenessLevel};

/// Progress through the blink challenge. Only ever moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LivenessStep {
    /// Face the camera straight.
    #[default]
    Straighten,
    BlinkChallenge,
    Complete,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LivenessState {
    pub level: LivenessLevel,
    pub step: LivenessStep,
    pub blink_count: u32,
}

impl LivenessState {
    pub fn new(level: LivenessLevel) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }
}

/// What changed on this frame, for the caller to publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessUpdate {
    Unchanged,
    Started,
    BlinkCounted { blink_count: u32 },
    Completed { blink_count: u32 },
}

/// Drives the blink challenge from per-frame eye-openness probabilities.
pub struct LivenessStepper {
    blink_threshold: f64,
    required_blinks: u32,
}

impl LivenessStepper {
    pub fn new(blink_threshold: f64, required_blinks: u32) -> Self {
        Self {
            blink_threshold,
            required_blinks,
        }
    }

    pub fn from_thresholds(thresholds: &CaptureThresholds) -> Self {
        Self::new(thresholds.blink_threshold, thresholds.required_blinks)
    }

    /// Both eyes below the threshold. A missing probability reads as open.
    pub fn eyes_closed(&self, face: &DetectedFace) -> bool {
        let left = face.left_eye_open.unwrap_or(1.0);
        let right = face.right_eye_open.unwrap_or(1.0);
        left < self.blink_threshold && right < self.blink_threshold
    }

    /// Advances the challenge for one single-face frame.
    ///
    /// A blink counts on the closing edge; `eye_closed` holds until the eyes
    /// reopen so a long closure is one blink.
    pub fn observe(
        &self,
        state: &mut LivenessState,
        eye_closed: &mut bool,
        face: &DetectedFace,
    ) -> LivenessUpdate {
        if state.level == LivenessLevel::Off {
            return LivenessUpdate::Unchanged;
        }

        match state.step {
            LivenessStep::Straighten => {
                state.step = LivenessStep::BlinkChallenge;
                LivenessUpdate::Started
            }
            LivenessStep::BlinkChallenge => {
                let closed = self.eyes_closed(face);
                let mut counted = false;
                if closed && !*eye_closed {
                    state.blink_count += 1;
                    *eye_closed = true;
                    counted = true;
                } else if !closed && *eye_closed {
                    *eye_closed = false;
                }

                if state.blink_count >= self.required_blinks {
                    state.step = LivenessStep::Complete;
                    LivenessUpdate::Completed {
                        blink_count: state.blink_count,
                    }
                } else if counted {
                    LivenessUpdate::BlinkCounted {
                        blink_count: state.blink_count,
                    }
                } else {
                    LivenessUpdate::Unchanged
                }
            }
            LivenessStep::Complete => LivenessUpdate::Unchanged,
        }
    }

    pub fn is_satisfied(&self, state: &LivenessState) -> bool {
        match state.level {
            LivenessLevel::Off => true,
            LivenessLevel::BlinkChallenge => {
                state.step == LivenessStep::Complete && state.blink_count >= self.required_blinks
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::bounding_box::BoundingBox;

    fn face(left: f64, right: f64) -> DetectedFace {
        DetectedFace::with_bounds(BoundingBox::new(0.0, 0.0, 10.0, 10.0)).with_eyes(left, right)
    }

    fn open() -> DetectedFace {
        face(0.9, 0.9)
    }

    fn closed() -> DetectedFace {
        face(0.1, 0.05)
    }

    fn started(stepper: &LivenessStepper) -> (LivenessState, bool) {
        let mut state = LivenessState::new(LivenessLevel::BlinkChallenge);
        let mut eye_closed = false;
        assert_eq!(
            stepper.observe(&mut state, &mut eye_closed, &open()),
            LivenessUpdate::Started
        );
        (state, eye_closed)
    }

    #[test]
    fn test_off_level_never_changes() {
        let stepper = LivenessStepper::new(0.3, 3);
        let mut state = LivenessState::new(LivenessLevel::Off);
        let mut eye_closed = false;
        for f in [open(), closed(), open()] {
            assert_eq!(
                stepper.observe(&mut state, &mut eye_closed, &f),
                LivenessUpdate::Unchanged
            );
        }
        assert_eq!(state.step, LivenessStep::Straighten);
        assert!(stepper.is_satisfied(&state));
    }

    #[test]
    fn test_first_frame_starts_challenge_without_counting() {
        let stepper = LivenessStepper::new(0.3, 3);
        let mut state = LivenessState::new(LivenessLevel::BlinkChallenge);
        let mut eye_closed = false;

        // Eyes closed on the very first frame: only the step advances.
        let update = stepper.observe(&mut state, &mut eye_closed, &closed());

        assert_eq!(update, LivenessUpdate::Started);
        assert_eq!(state.step, LivenessStep::BlinkChallenge);
        assert_eq!(state.blink_count, 0);
        assert!(!eye_closed);
    }

    #[test]
    fn test_long_closure_counts_once() {
        let stepper = LivenessStepper::new(0.3, 3);
        let (mut state, mut eye_closed) = started(&stepper);

        assert_eq!(
            stepper.observe(&mut state, &mut eye_closed, &closed()),
            LivenessUpdate::BlinkCounted { blink_count: 1 }
        );
        for _ in 0..4 {
            assert_eq!(
                stepper.observe(&mut state, &mut eye_closed, &closed()),
                LivenessUpdate::Unchanged
            );
        }
        assert_eq!(state.blink_count, 1);
        assert!(eye_closed);

        stepper.observe(&mut state, &mut eye_closed, &open());
        assert!(!eye_closed);
    }

    #[test]
    fn test_one_eye_closed_is_not_a_blink() {
        let stepper = LivenessStepper::new(0.3, 3);
        let (mut state, mut eye_closed) = started(&stepper);

        stepper.observe(&mut state, &mut eye_closed, &face(0.1, 0.8));
        stepper.observe(&mut state, &mut eye_closed, &face(0.8, 0.1));

        assert_eq!(state.blink_count, 0);
    }

    #[test]
    fn test_missing_probabilities_read_as_open() {
        let stepper = LivenessStepper::new(0.3, 3);
        let no_eyes = DetectedFace::with_bounds(BoundingBox::new(0.0, 0.0, 10.0, 10.0));
        assert!(!stepper.eyes_closed(&no_eyes));

        let one_eye = DetectedFace {
            left_eye_open: Some(0.0),
            ..no_eyes
        };
        assert!(!stepper.eyes_closed(&one_eye));
    }

    #[test]
    fn test_three_blinks_complete_and_fourth_is_ignored() {
        let stepper = LivenessStepper::new(0.3, 3);
        let (mut state, mut eye_closed) = started(&stepper);

        let mut updates = Vec::new();
        for _ in 0..3 {
            updates.push(stepper.observe(&mut state, &mut eye_closed, &closed()));
            updates.push(stepper.observe(&mut state, &mut eye_closed, &open()));
        }

        assert_eq!(
            updates,
            vec![
                LivenessUpdate::BlinkCounted { blink_count: 1 },
                LivenessUpdate::Unchanged,
                LivenessUpdate::BlinkCounted { blink_count: 2 },
                LivenessUpdate::Unchanged,
                LivenessUpdate::Completed { blink_count: 3 },
                LivenessUpdate::Unchanged,
            ]
        );
        assert_eq!(state.step, LivenessStep::Complete);
        assert!(stepper.is_satisfied(&state));

        stepper.observe(&mut state, &mut eye_closed, &closed());
        stepper.observe(&mut state, &mut eye_closed, &open());
        assert_eq!(state.blink_count, 3);
        assert_eq!(state.step, LivenessStep::Complete);
    }

    #[test]
    fn test_complete_step_needs_enough_blinks() {
        let stepper = LivenessStepper::new(0.3, 3);
        let state = LivenessState {
            level: LivenessLevel::BlinkChallenge,
            step: LivenessStep::Complete,
            blink_count: 1,
        };
        assert!(!stepper.is_satisfied(&state));
        assert!(!stepper.is_satisfied(&LivenessState::new(LivenessLevel::BlinkChallenge)));
    }
}
