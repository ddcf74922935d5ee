use crossbeam_channel::Sender;

use crate::shared::constants::{
    ANTI_SPOOF_EVENT_INTERVAL_MS, LIVENESS_EVENT_INTERVAL_MS, STATUS_EVENT_INTERVAL_MS,
};

use super::session_event::{
    AntiSpoofEvent, CaptureEvent, LivenessStepEvent, SessionEvent, StatusEvent,
};

/// Minimum-interval gate for one kind of outward event.
#[derive(Debug, Clone)]
pub struct EventThrottle {
    min_interval_ms: u64,
    last_emitted_ms: Option<u64>,
}

impl EventThrottle {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval_ms,
            last_emitted_ms: None,
        }
    }

    /// Admits an event if strictly more than the interval has passed since
    /// the last admitted one, and records it.
    pub fn admit(&mut self, now_ms: u64) -> bool {
        if let Some(last) = self.last_emitted_ms {
            if now_ms.saturating_sub(last) <= self.min_interval_ms {
                return false;
            }
        }
        self.last_emitted_ms = Some(now_ms);
        true
    }
}

/// Producer-side end of the event feed.
///
/// Status, liveness and anti-spoof updates each have their own cadence so
/// the consumer never sees more than a fixed rate regardless of frame rate.
/// Capture events are never throttled.
pub struct StatusPublisher {
    tx: Sender<SessionEvent>,
    status: EventThrottle,
    liveness: EventThrottle,
    anti_spoof: EventThrottle,
}

impl StatusPublisher {
    pub fn new(tx: Sender<SessionEvent>) -> Self {
        Self::with_intervals(
            tx,
            STATUS_EVENT_INTERVAL_MS,
            LIVENESS_EVENT_INTERVAL_MS,
            ANTI_SPOOF_EVENT_INTERVAL_MS,
        )
    }

    pub fn with_intervals(
        tx: Sender<SessionEvent>,
        status_ms: u64,
        liveness_ms: u64,
        anti_spoof_ms: u64,
    ) -> Self {
        Self {
            tx,
            status: EventThrottle::new(status_ms),
            liveness: EventThrottle::new(liveness_ms),
            anti_spoof: EventThrottle::new(anti_spoof_ms),
        }
    }

    pub fn sender(&self) -> Sender<SessionEvent> {
        self.tx.clone()
    }

    pub fn publish_status(&mut self, event: StatusEvent, now_ms: u64) -> bool {
        self.status.admit(now_ms) && self.send(SessionEvent::Status(event))
    }

    pub fn publish_liveness(&mut self, event: LivenessStepEvent, now_ms: u64) -> bool {
        self.liveness.admit(now_ms) && self.send(SessionEvent::LivenessStep(event))
    }

    pub fn publish_anti_spoof(&mut self, event: AntiSpoofEvent, now_ms: u64) -> bool {
        self.anti_spoof.admit(now_ms) && self.send(SessionEvent::AntiSpoof(event))
    }

    pub fn publish_capture(&mut self, event: CaptureEvent) -> bool {
        self.send(SessionEvent::Captured(event))
    }

    fn send(&self, event: SessionEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(_) => {
                log::debug!("Session event dropped: no receiver");
                false
            }
        }
    }
}
