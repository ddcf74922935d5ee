use serde::Serialize;

use crate::assessment::anti_spoof_aggregator::AntiSpoofState;
use crate::assessment::capture_gate::CaptureLatch;
use crate::assessment::centering_evaluator::CenteringState;
use crate::assessment::liveness_stepper::LivenessState;
use crate::assessment::stability_tracker::TrackingState;
use crate::shared::thresholds::LivenessLevel;

/// Booleans of the session record.
///
/// `external_busy`, `session_active` and `code_scan_mode` are owned by the
/// consumer and mirrored in from the session handle at the top of each
/// frame; the rest are written by the frame pipeline only.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionFlags {
    pub capture: CaptureLatch,
    pub external_busy: bool,
    pub session_active: bool,
    pub code_scan_mode: bool,
    pub has_single_face: bool,
    pub is_centered: bool,
    pub eye_closed: bool,
}

impl Default for SessionFlags {
    fn default() -> Self {
        Self {
            capture: CaptureLatch::Idle,
            external_busy: false,
            session_active: true,
            code_scan_mode: false,
            has_single_face: false,
            is_centered: false,
            eye_closed: false,
        }
    }
}

/// The single mutable record of one capture session.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SessionState {
    /// Reset generation this record belongs to.
    pub generation: u64,
    pub last_processed_at_ms: Option<u64>,
    pub tracking: TrackingState,
    pub flags: SessionFlags,
    pub liveness: LivenessState,
    pub anti_spoof: AntiSpoofState,
    pub centering: CenteringState,
    /// Processed single-face frames; batches outward events.
    pub publish_counter: u64,
}

impl SessionState {
    pub fn new(level: LivenessLevel) -> Self {
        Self {
            liveness: LivenessState::new(level),
            ..Self::default()
        }
    }

    pub fn is_captured(&self) -> bool {
        self.flags.capture.is_captured()
    }

    /// Clears every counter, flag and the latch. Keeps the consumer-owned
    /// control flags, the liveness level and the latched frame dimensions.
    pub fn soft_reset(&mut self) {
        let mut fresh = SessionState::new(self.liveness.level);
        fresh.generation = self.generation;
        fresh.flags.external_busy = self.flags.external_busy;
        fresh.flags.session_active = self.flags.session_active;
        fresh.flags.code_scan_mode = self.flags.code_scan_mode;
        fresh.centering.frame_width = self.centering.frame_width;
        fresh.centering.frame_height = self.centering.frame_height;
        *self = fresh;
    }

    /// Discards the record. Control flags survive because the consumer owns
    /// them; frame dimensions are learned again.
    pub fn hard_reset(&mut self, level: LivenessLevel) {
        let mut fresh = SessionState::new(level);
        fresh.generation = self.generation;
        fresh.flags.external_busy = self.flags.external_busy;
        fresh.flags.session_active = self.flags.session_active;
        fresh.flags.code_scan_mode = self.flags.code_scan_mode;
        *self = fresh;
    }

    /// Zero faces, several faces or an unusable detection: every per-face
    /// counter goes back to its empty baseline. Liveness progress is kept.
    pub fn clear_face(&mut self) {
        self.tracking.clear();
        self.anti_spoof.distrust();
        self.flags.has_single_face = false;
        self.centering.clear();
        self.flags.is_centered = false;
    }
}
