use serde::Serialize;

use crate::assessment::liveness_stepper::LivenessStep;
use crate::detection::domain::spoof_scorer::RawSpoofResult;
use crate::shared::bounding_box::BoundingBox;

use super::session_state::SessionState;

/// Anti-spoof summary carried inside every status event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AntiSpoofSnapshot {
    pub is_live: bool,
    pub confidence: f64,
    pub consecutive_live_frames: u32,
    pub is_centered: bool,
    pub has_single_face: bool,
}

impl AntiSpoofSnapshot {
    pub fn of(state: &SessionState) -> Self {
        Self {
            is_live: state.anti_spoof.is_live,
            confidence: state.anti_spoof.confidence,
            consecutive_live_frames: state.anti_spoof.consecutive_live_frames,
            is_centered: state.flags.is_centered,
            has_single_face: state.flags.has_single_face,
        }
    }
}

/// Throttled summary of the latest processed frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusEvent {
    pub generation: u64,
    pub face_count: usize,
    pub progress_percent: f64,
    pub liveness_step: LivenessStep,
    pub blink_count: u32,
    pub is_centered: bool,
    pub anti_spoof: AntiSpoofSnapshot,
}

impl StatusEvent {
    /// Status for a frame without exactly one usable face.
    pub fn without_single_face(state: &SessionState, face_count: usize) -> Self {
        Self {
            generation: state.generation,
            face_count,
            progress_percent: 0.0,
            liveness_step: state.liveness.step,
            blink_count: state.liveness.blink_count,
            is_centered: false,
            anti_spoof: AntiSpoofSnapshot::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LivenessStepEvent {
    pub generation: u64,
    pub step: LivenessStep,
    /// Present when a blink was counted on this frame.
    pub blink_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AntiSpoofEvent {
    pub generation: u64,
    pub is_live: bool,
    pub confidence: f64,
    pub consecutive_live_frames: u32,
    pub is_centered: bool,
    pub raw_result: Option<RawSpoofResult>,
}

/// Fired exactly once per session, when the capture gate closes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureEvent {
    pub generation: u64,
    pub bounding_box: BoundingBox,
    /// Anti-spoof evidence behind the decision, kept for audit.
    pub raw_spoof_result: Option<RawSpoofResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEvent {
    Status(StatusEvent),
    LivenessStep(LivenessStepEvent),
    AntiSpoof(AntiSpoofEvent),
    Captured(CaptureEvent),
}

impl SessionEvent {
    pub fn generation(&self) -> u64 {
        match self {
            SessionEvent::Status(e) => e.generation,
            SessionEvent::LivenessStep(e) => e.generation,
            SessionEvent::AntiSpoof(e) => e.generation,
            SessionEvent::Captured(e) => e.generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::thresholds::LivenessLevel;

    #[test]
    fn test_without_single_face_reports_empty_state() {
        let mut state = SessionState::new(LivenessLevel::BlinkChallenge);
        state.generation = 2;
        state.liveness.step = LivenessStep::BlinkChallenge;
        state.liveness.blink_count = 1;
        state.anti_spoof.confidence = 0.7;

        let status = StatusEvent::without_single_face(&state, 2);

        assert_eq!(status.generation, 2);
        assert_eq!(status.face_count, 2);
        assert_eq!(status.progress_percent, 0.0);
        assert_eq!(status.liveness_step, LivenessStep::BlinkChallenge);
        assert_eq!(status.blink_count, 1);
        assert_eq!(status.anti_spoof, AntiSpoofSnapshot::default());
    }

    #[test]
    fn test_events_serialize_with_kind_tag() {
        let event = SessionEvent::Captured(CaptureEvent {
            generation: 1,
            bounding_box: BoundingBox::new(1.0, 2.0, 3.0, 4.0),
            raw_spoof_result: None,
        });

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["kind"], "captured");
        assert_eq!(json["bounding_box"]["width"], 3.0);
        assert!(json["raw_spoof_result"].is_null());
        assert_eq!(event.generation(), 1);
    }
}
