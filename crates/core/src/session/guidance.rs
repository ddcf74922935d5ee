use std::fmt;

use serde::Serialize;

use crate::assessment::liveness_stepper::LivenessStep;
use crate::shared::thresholds::LivenessLevel;

use super::session_event::StatusEvent;

/// What the user should be told to do next, derived from the latest status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Guidance {
    MultipleFaces,
    PositionFace,
    CenterFace,
    FaceStraight,
    VerifyingLiveness,
    Blink { done: u32, required: u32 },
    HoldStill,
    Capturing,
}

impl Guidance {
    pub fn for_status(status: &StatusEvent, level: LivenessLevel, required_blinks: u32) -> Self {
        if status.face_count > 1 {
            return Guidance::MultipleFaces;
        }
        if !status.anti_spoof.has_single_face {
            return Guidance::PositionFace;
        }
        if !status.is_centered {
            return Guidance::CenterFace;
        }

        let hold_or_capture = || {
            if !status.anti_spoof.is_live {
                Guidance::VerifyingLiveness
            } else if status.progress_percent < 100.0 {
                Guidance::HoldStill
            } else {
                Guidance::Capturing
            }
        };

        match (level, status.liveness_step) {
            (LivenessLevel::Off, _) => hold_or_capture(),
            (LivenessLevel::BlinkChallenge, LivenessStep::Straighten) => Guidance::FaceStraight,
            (LivenessLevel::BlinkChallenge, LivenessStep::BlinkChallenge) => {
                if !status.anti_spoof.is_live {
                    Guidance::VerifyingLiveness
                } else {
                    Guidance::Blink {
                        done: status.blink_count,
                        required: required_blinks,
                    }
                }
            }
            (LivenessLevel::BlinkChallenge, LivenessStep::Complete) => hold_or_capture(),
        }
    }
}

impl fmt::Display for Guidance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guidance::MultipleFaces => write!(f, "Multiple faces detected"),
            Guidance::PositionFace => write!(f, "Position your face in the frame"),
            Guidance::CenterFace => write!(f, "Center your face in the frame"),
            Guidance::FaceStraight => write!(f, "Face the camera straight"),
            Guidance::VerifyingLiveness => write!(f, "Verifying liveness..."),
            Guidance::Blink { done, required } => {
                write!(f, "Blink your eyes {done} of {required} times")
            }
            Guidance::HoldStill => write!(f, "Hold still..."),
            Guidance::Capturing => write!(f, "Perfect! Capturing..."),
        }
    }
}
