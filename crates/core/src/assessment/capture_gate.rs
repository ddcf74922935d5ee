use serde::Serialize;

/// One-shot capture latch. `Idle -> Captured` is the only transition; only a
/// session reset puts it back to `Idle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureLatch {
    #[default]
    Idle,
    Captured,
}

impl CaptureLatch {
    pub fn is_captured(self) -> bool {
        self == CaptureLatch::Captured
    }

    /// Closes the latch. Returns `false` (and changes nothing) if it was
    /// already closed.
    pub fn try_capture(&mut self) -> bool {
        match self {
            CaptureLatch::Idle => {
                *self = CaptureLatch::Captured;
                true
            }
            CaptureLatch::Captured => false,
        }
    }
}

/// The verdicts of the per-frame estimators, as the gate sees them.
///
/// Each field comes from the estimator that owns the rule: `is_stable` from
/// `StabilityTracker::is_stable`, `is_live` from `AntiSpoofAggregator::is_live`,
/// `liveness_satisfied` from `LivenessStepper::is_satisfied`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureReadiness {
    pub is_stable: bool,
    pub is_centered: bool,
    pub is_live: bool,
    pub liveness_satisfied: bool,
}

/// Would this frame capture, given the latch state?
pub fn is_ready(latch: CaptureLatch, r: &CaptureReadiness) -> bool {
    !latch.is_captured() && r.is_stable && r.is_live && r.is_centered && r.liveness_satisfied
}

/// Evaluates the predicate and closes the latch in the same step.
/// Returns `true` exactly once per open latch.
pub fn evaluate(latch: &mut CaptureLatch, r: &CaptureReadiness) -> bool {
    is_ready(*latch, r) && latch.try_capture()
}
