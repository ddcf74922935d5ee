use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::session_state::SessionState;

/// Consumer-owned switches the frame pipeline reads at the top of each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlFlags {
    pub external_busy: bool,
    pub session_active: bool,
    pub code_scan_mode: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetRequest {
    Soft,
    Hard,
}

struct SharedSession {
    external_busy: AtomicBool,
    session_active: AtomicBool,
    code_scan_mode: AtomicBool,
    generation: AtomicU64,
    hard_reset_pending: AtomicBool,
    snapshot: RwLock<Arc<SessionState>>,
}

/// The consumer's view of a capture session.
///
/// Cloning is cheap. The handle never touches tracking state: it flips
/// control flags, requests resets and reads the last published snapshot.
/// Every reset request bumps the generation; events tagged with an older
/// generation come from a frame that started before the reset and should be
/// ignored.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<SharedSession>,
}

impl SessionHandle {
    pub(crate) fn new(initial: &SessionState) -> Self {
        Self {
            shared: Arc::new(SharedSession {
                external_busy: AtomicBool::new(initial.flags.external_busy),
                session_active: AtomicBool::new(initial.flags.session_active),
                code_scan_mode: AtomicBool::new(initial.flags.code_scan_mode),
                generation: AtomicU64::new(initial.generation),
                hard_reset_pending: AtomicBool::new(false),
                snapshot: RwLock::new(Arc::new(initial.clone())),
            }),
        }
    }

    /// Activates or deactivates frame processing. Toggling while the last
    /// snapshot shows a capture releases the latch via a soft reset.
    pub fn set_active(&self, active: bool) {
        let was_active = self.shared.session_active.swap(active, Ordering::SeqCst);
        if was_active != active && self.is_captured() {
            self.soft_reset();
        }
    }

    /// Marks downstream work (photo capture, upload) in progress; frames are
    /// skipped while set.
    pub fn set_external_busy(&self, busy: bool) {
        self.shared.external_busy.store(busy, Ordering::SeqCst);
    }

    /// Switches between face capture and code scanning. Any switch starts
    /// face capture over.
    pub fn set_code_scan_mode(&self, scanning: bool) {
        let was_scanning = self.shared.code_scan_mode.swap(scanning, Ordering::SeqCst);
        if was_scanning != scanning {
            self.soft_reset();
        }
    }

    /// Requests that counters, flags and the latch be cleared before the
    /// next frame. Configuration is kept.
    pub fn soft_reset(&self) {
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!("Soft reset requested (generation {generation})");
    }

    /// Requests that the whole session record be rebuilt before the next
    /// frame.
    pub fn hard_reset(&self) {
        self.shared.hard_reset_pending.store(true, Ordering::SeqCst);
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!("Hard reset requested (generation {generation})");
    }

    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    /// Whether an event tagged with `generation` still belongs to the
    /// current session.
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation()
    }

    /// The last coherent state published by the frame pipeline.
    pub fn snapshot(&self) -> Arc<SessionState> {
        match self.shared.snapshot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_captured(&self) -> bool {
        self.snapshot().is_captured()
    }

    pub(crate) fn control_flags(&self) -> ControlFlags {
        ControlFlags {
            external_busy: self.shared.external_busy.load(Ordering::SeqCst),
            session_active: self.shared.session_active.load(Ordering::SeqCst),
            code_scan_mode: self.shared.code_scan_mode.load(Ordering::SeqCst),
        }
    }

    /// Returns the pending reset, if the generation moved past `applied`,
    /// together with the generation it brings the session to.
    pub(crate) fn take_reset(&self, applied: u64) -> Option<(ResetRequest, u64)> {
        let generation = self.shared.generation.load(Ordering::SeqCst);
        if generation == applied {
            return None;
        }
        let kind = if self.shared.hard_reset_pending.swap(false, Ordering::SeqCst) {
            ResetRequest::Hard
        } else {
            ResetRequest::Soft
        };
        Some((kind, generation))
    }

    /// Replaces the published snapshot as a whole.
    pub(crate) fn publish(&self, state: &SessionState) {
        let next = Arc::new(state.clone());
        match self.shared.snapshot.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::capture_gate::CaptureLatch;
    use crate::shared::thresholds::LivenessLevel;

    fn handle() -> SessionHandle {
        SessionHandle::new(&SessionState::new(LivenessLevel::Off))
    }

    fn captured_state() -> SessionState {
        let mut state = SessionState::new(LivenessLevel::Off);
        state.flags.capture = CaptureLatch::Captured;
        state
    }

    #[test]
    fn test_initial_flags_mirror_state() {
        let h = handle();
        assert_eq!(
            h.control_flags(),
            ControlFlags {
                external_busy: false,
                session_active: true,
                code_scan_mode: false,
            }
        );
        assert_eq!(h.generation(), 0);
        assert!(h.take_reset(0).is_none());
    }

    #[test]
    fn test_soft_reset_bumps_generation() {
        let h = handle();
        h.soft_reset();
        assert_eq!(h.generation(), 1);
        assert!(!h.is_current(0));
        assert_eq!(h.take_reset(0), Some((ResetRequest::Soft, 1)));
        assert!(h.take_reset(1).is_none());
    }

    #[test]
    fn test_hard_reset_takes_precedence_over_soft() {
        let h = handle();
        h.soft_reset();
        h.hard_reset();
        assert_eq!(h.take_reset(0), Some((ResetRequest::Hard, 2)));
        // The pending flag is consumed.
        h.soft_reset();
        assert_eq!(h.take_reset(2), Some((ResetRequest::Soft, 3)));
    }

    #[test]
    fn test_set_active_releases_captured_latch() {
        let h = handle();
        h.publish(&captured_state());

        h.set_active(false);
        assert_eq!(h.generation(), 1);
        assert!(!h.control_flags().session_active);

        // Same value again: no new reset.
        h.set_active(false);
        assert_eq!(h.generation(), 1);
    }

    #[test]
    fn test_set_active_without_capture_does_not_reset() {
        let h = handle();
        h.set_active(false);
        h.set_active(true);
        assert_eq!(h.generation(), 0);
    }

    #[test]
    fn test_code_scan_toggle_requests_soft_reset() {
        let h = handle();
        h.set_code_scan_mode(true);
        assert!(h.control_flags().code_scan_mode);
        assert_eq!(h.generation(), 1);
        h.set_code_scan_mode(true);
        assert_eq!(h.generation(), 1);
        h.set_code_scan_mode(false);
        assert_eq!(h.generation(), 2);
    }

    #[test]
    fn test_external_busy_flag() {
        let h = handle();
        h.set_external_busy(true);
        assert!(h.control_flags().external_busy);
        assert_eq!(h.generation(), 0);
    }

    #[test]
    fn test_snapshot_is_replaced_whole() {
        let h = handle();
        let before = h.snapshot();
        h.publish(&captured_state());
        let after = h.snapshot();

        assert!(!before.is_captured());
        assert!(after.is_captured());
        assert!(h.is_captured());
    }

    #[test]
    fn test_clones_share_state() {
        let h = handle();
        let other = h.clone();
        other.set_external_busy(true);
        assert!(h.control_flags().external_busy);
    }
}
