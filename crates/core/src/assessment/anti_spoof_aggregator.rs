use serde::Serialize;

use crate::detection::domain::spoof_scorer::RawSpoofResult;

/// Hysteresis state for the anti-spoof judgment.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AntiSpoofState {
    pub consecutive_live_frames: u32,
    pub is_live: bool,
    pub confidence: f64,
    pub last_raw_result: Option<RawSpoofResult>,
}

impl AntiSpoofState {
    /// Spoof judgments are not trusted once the face is mispositioned or
    /// gone: drop straight to zero instead of decaying.
    pub fn distrust(&mut self) {
        self.consecutive_live_frames = 0;
        self.is_live = false;
    }

    /// A failing frame costs one step of the streak.
    pub fn decay(&mut self) {
        self.consecutive_live_frames = self.consecutive_live_frames.saturating_sub(1);
    }
}

/// Turns per-frame spoof scores into a debounced "is live" flag.
///
/// A frame passes only if sharpness, model confidence and the combined
/// score all clear their bars. Passing frames add one (saturating), failing
/// frames subtract one (floored at zero).
pub struct AntiSpoofAggregator {
    sharpness_floor: f64,
    acceptance_level: f64,
    required_consecutive: u32,
}

impl AntiSpoofAggregator {
    pub fn new(sharpness_floor: f64, acceptance_level: f64, required_consecutive: u32) -> Self {
        Self {
            sharpness_floor,
            acceptance_level,
            required_consecutive,
        }
    }

    pub fn passes(&self, result: &RawSpoofResult) -> bool {
        result.laplacian_score > self.sharpness_floor
            && result.confidence > self.acceptance_level
            && result.combined_score > self.acceptance_level
    }

    /// Folds one scoring attempt into the state. `None` (no result, scorer
    /// error or unavailable model) counts as a failing frame and keeps the
    /// previous raw result for audit. Returns whether the frame passed.
    pub fn observe(&self, state: &mut AntiSpoofState, result: Option<RawSpoofResult>) -> bool {
        let passed = match result {
            Some(raw) => {
                state.last_raw_result = Some(raw);
                state.confidence = raw.confidence;
                self.passes(&raw)
            }
            None => false,
        };

        if passed {
            state.consecutive_live_frames =
                (state.consecutive_live_frames + 1).min(self.required_consecutive);
        } else {
            state.decay();
        }
        state.is_live = self.is_live(state);
        passed
    }

    pub fn is_live(&self, state: &AntiSpoofState) -> bool {
        state.consecutive_live_frames >= self.required_consecutive
    }
}
