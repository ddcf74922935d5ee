use std::time::Instant;

use crossbeam_channel::Receiver;

use crate::assessment::anti_spoof_aggregator::AntiSpoofAggregator;
use crate::assessment::capture_gate::{self, CaptureReadiness};
use crate::assessment::centering_evaluator::CenteringEvaluator;
use crate::assessment::liveness_stepper::{LivenessStep, LivenessStepper, LivenessUpdate};
use crate::assessment::stability_tracker::StabilityTracker;
use crate::detection::domain::face_detector::{DetectedFace, FaceDetector};
use crate::detection::domain::spoof_scorer::SpoofScorer;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::session::session_event::{
    AntiSpoofEvent, AntiSpoofSnapshot, CaptureEvent, LivenessStepEvent, SessionEvent, StatusEvent,
};
use crate::session::session_handle::{ResetRequest, SessionHandle};
use crate::session::session_state::SessionState;
use crate::session::status_publisher::StatusPublisher;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::shared::thresholds::{ConfigError, SessionConfig};

/// Why a frame was dropped before detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ExternalBusy,
    CodeScanMode,
    AlreadyCaptured,
    Inactive,
    Throttled,
    Backlogged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Skipped(SkipReason),
    NoFace,
    MultipleFaces(usize),
    SingleFace { captured: bool },
}

impl FrameOutcome {
    /// Stable label used for outcome counting.
    pub fn name(&self) -> &'static str {
        match self {
            FrameOutcome::Skipped(SkipReason::ExternalBusy) => "skipped_busy",
            FrameOutcome::Skipped(SkipReason::CodeScanMode) => "skipped_code_scan",
            FrameOutcome::Skipped(SkipReason::AlreadyCaptured) => "skipped_captured",
            FrameOutcome::Skipped(SkipReason::Inactive) => "skipped_inactive",
            FrameOutcome::Skipped(SkipReason::Throttled) => "throttled",
            FrameOutcome::Skipped(SkipReason::Backlogged) => "backlogged",
            FrameOutcome::NoFace => "no_face",
            FrameOutcome::MultipleFaces(_) => "multiple_faces",
            FrameOutcome::SingleFace { captured: false } => "single_face",
            FrameOutcome::SingleFace { captured: true } => "captured",
        }
    }
}

/// Per-frame decision pipeline for one capture session.
///
/// Owns the working session record and is its only writer. Each processed
/// frame runs detection, then tracking, centering, anti-spoof and liveness,
/// and finally the capture gate. The finished record is published to
/// [`SessionHandle`] readers as a whole.
pub struct FramePipeline {
    config: SessionConfig,
    detector: Box<dyn FaceDetector>,
    scorer: Box<dyn SpoofScorer>,
    tracker: StabilityTracker,
    centering: CenteringEvaluator,
    stepper: LivenessStepper,
    aggregator: AntiSpoofAggregator,
    state: SessionState,
    handle: SessionHandle,
    publisher: StatusPublisher,
    events: Receiver<SessionEvent>,
    last_started_ms: Option<u64>,
    logger: Box<dyn PipelineLogger>,
}

impl FramePipeline {
    pub fn new(
        config: SessionConfig,
        detector: Box<dyn FaceDetector>,
        scorer: Box<dyn SpoofScorer>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let t = &config.thresholds;
        let state = SessionState::new(config.liveness_level);
        let handle = SessionHandle::new(&state);
        let (tx, events) = crossbeam_channel::unbounded();

        Ok(Self {
            tracker: StabilityTracker::from_thresholds(t),
            centering: CenteringEvaluator::from_thresholds(t),
            stepper: LivenessStepper::from_thresholds(t),
            aggregator: AntiSpoofAggregator::new(
                t.sharpness_floor,
                config.spoof_acceptance_level,
                t.required_consecutive_live_frames,
            ),
            config,
            detector,
            scorer,
            state,
            handle,
            publisher: StatusPublisher::new(tx),
            events,
            last_started_ms: None,
            logger: Box::new(NullPipelineLogger),
        })
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Overrides the minimum spacing of status, liveness and anti-spoof
    /// events.
    pub fn with_event_intervals(
        mut self,
        status_ms: u64,
        liveness_ms: u64,
        anti_spoof_ms: u64,
    ) -> Self {
        let tx = self.publisher.sender();
        self.publisher = StatusPublisher::with_intervals(tx, status_ms, liveness_ms, anti_spoof_ms);
        self
    }

    /// A new consumer handle onto this session.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// The event feed. Receivers share one queue: each event is delivered
    /// to exactly one of them.
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.events.clone()
    }

    pub fn logger(&self) -> &dyn PipelineLogger {
        &*self.logger
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The working record as of the last processed frame.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Runs one camera frame through the pipeline.
    ///
    /// `now_ms` is the processing start time; the frame's own timestamp,
    /// when present, drives the interval gate instead. The frame is dropped
    /// (and its release hook run) before this returns, whatever the outcome.
    pub fn process_frame(&mut self, frame: Frame, now_ms: u64) -> FrameOutcome {
        let outcome = self.run(&frame, now_ms);
        self.logger.outcome(outcome.name());
        outcome
    }

    fn run(&mut self, frame: &Frame, now_ms: u64) -> FrameOutcome {
        let mut dirty = self.apply_pending_reset();
        dirty |= self.mirror_control_flags();

        let frame_time = frame.timestamp_ms().unwrap_or(now_ms);
        if let Some(reason) = self.skip_reason(frame_time, now_ms) {
            if dirty {
                self.handle.publish(&self.state);
            }
            log::trace!("Frame {} skipped: {reason:?}", frame.index());
            return FrameOutcome::Skipped(reason);
        }

        let frame_start = Instant::now();
        self.last_started_ms = Some(now_ms);
        if self
            .state
            .centering
            .latch_frame_dimensions(frame.width(), frame.height())
        {
            log::debug!("Frame dimensions set to {}x{}", frame.width(), frame.height());
        }

        let detect_start = Instant::now();
        let faces = match self.detector.detect(frame) {
            Ok(faces) => faces,
            Err(e) => {
                log::debug!("Detection failed on frame {}: {e}", frame.index());
                Vec::new()
            }
        };
        self.logger.timing("detect", elapsed_ms(detect_start));
        self.state.last_processed_at_ms = Some(frame_time);

        let (outcome, capture) = match faces.as_slice() {
            [] => (self.on_no_face(0, now_ms), None),
            [face] => match usable_bounds(face) {
                Some(bbox) => self.on_single_face(frame, face, bbox, now_ms),
                None => (self.on_no_face(0, now_ms), None),
            },
            several => (self.on_no_face(several.len(), now_ms), None),
        };

        let frame_ms = elapsed_ms(frame_start);
        self.logger.timing("frame", frame_ms);
        if frame_ms > self.config.thresholds.max_processing_ms as f64 {
            log::warn!(
                "Frame {} took {frame_ms:.1}ms (budget {}ms)",
                frame.index(),
                self.config.thresholds.max_processing_ms
            );
        }

        self.handle.publish(&self.state);
        if let Some(capture) = capture {
            self.publisher.publish_capture(capture);
        }
        outcome
    }

    /// Applies a reset requested through the handle since the last frame.
    fn apply_pending_reset(&mut self) -> bool {
        let Some((kind, generation)) = self.handle.take_reset(self.state.generation) else {
            return false;
        };
        match kind {
            ResetRequest::Soft => self.state.soft_reset(),
            ResetRequest::Hard => self.state.hard_reset(self.config.liveness_level),
        }
        self.state.generation = generation;
        self.last_started_ms = None;
        log::info!("Session reset ({kind:?}), generation {generation}");
        true
    }

    fn mirror_control_flags(&mut self) -> bool {
        let control = self.handle.control_flags();
        let flags = &mut self.state.flags;
        let changed = flags.external_busy != control.external_busy
            || flags.session_active != control.session_active
            || flags.code_scan_mode != control.code_scan_mode;
        flags.external_busy = control.external_busy;
        flags.session_active = control.session_active;
        flags.code_scan_mode = control.code_scan_mode;
        changed
    }

    fn skip_reason(&self, frame_time: u64, now_ms: u64) -> Option<SkipReason> {
        let flags = &self.state.flags;
        let t = &self.config.thresholds;

        if flags.external_busy {
            return Some(SkipReason::ExternalBusy);
        }
        if flags.code_scan_mode {
            return Some(SkipReason::CodeScanMode);
        }
        if flags.capture.is_captured() {
            return Some(SkipReason::AlreadyCaptured);
        }
        if !flags.session_active {
            return Some(SkipReason::Inactive);
        }
        if let Some(last) = self.state.last_processed_at_ms {
            if frame_time.saturating_sub(last) < t.min_interval_ms {
                return Some(SkipReason::Throttled);
            }
        }
        if let Some(started) = self.last_started_ms {
            if now_ms.saturating_sub(started) < t.max_processing_ms {
                return Some(SkipReason::Backlogged);
            }
        }
        None
    }

    /// Zero faces, several faces or no usable box.
    fn on_no_face(&mut self, face_count: usize, now_ms: u64) -> FrameOutcome {
        self.state.clear_face();
        let status = StatusEvent::without_single_face(&self.state, face_count);
        self.publisher.publish_status(status, now_ms);
        match face_count {
            0 | 1 => FrameOutcome::NoFace,
            n => FrameOutcome::MultipleFaces(n),
        }
    }

    fn on_single_face(
        &mut self,
        frame: &Frame,
        face: &DetectedFace,
        bbox: BoundingBox,
        now_ms: u64,
    ) -> (FrameOutcome, Option<CaptureEvent>) {
        self.state.flags.has_single_face = true;
        let batch_interval = self.config.thresholds.batch_update_interval;
        let generation = self.state.generation;

        self.tracker.observe(&mut self.state.tracking, bbox);
        let is_centered = self.centering.observe(&mut self.state.centering, &bbox);
        self.state.flags.is_centered = is_centered;

        let scored = self.assess_spoof(frame, is_centered);
        if scored && self.state.publish_counter % batch_interval == 0 {
            let anti_spoof = &self.state.anti_spoof;
            let event = AntiSpoofEvent {
                generation,
                is_live: anti_spoof.is_live,
                confidence: anti_spoof.confidence,
                consecutive_live_frames: anti_spoof.consecutive_live_frames,
                is_centered,
                raw_result: anti_spoof.last_raw_result,
            };
            self.publisher.publish_anti_spoof(event, now_ms);
        }

        let update = self.stepper.observe(
            &mut self.state.liveness,
            &mut self.state.flags.eye_closed,
            face,
        );
        self.publish_liveness(update, now_ms);

        self.state.publish_counter += 1;
        if self.state.publish_counter % batch_interval == 0 {
            let status = StatusEvent {
                generation,
                face_count: 1,
                progress_percent: self.tracker.progress_percent(&self.state.tracking),
                liveness_step: self.state.liveness.step,
                blink_count: self.state.liveness.blink_count,
                is_centered,
                anti_spoof: AntiSpoofSnapshot::of(&self.state),
            };
            self.publisher.publish_status(status, now_ms);
        }

        let readiness = CaptureReadiness {
            is_stable: self.tracker.is_stable(&self.state.tracking),
            is_centered,
            is_live: self.aggregator.is_live(&self.state.anti_spoof),
            liveness_satisfied: self.stepper.is_satisfied(&self.state.liveness),
        };
        if !capture_gate::evaluate(&mut self.state.flags.capture, &readiness) {
            return (FrameOutcome::SingleFace { captured: false }, None);
        }

        self.logger
            .info(&format!("Capture fired on frame {} (generation {generation})", frame.index()));
        let capture = CaptureEvent {
            generation,
            bounding_box: bbox,
            raw_spoof_result: self.state.anti_spoof.last_raw_result,
        };
        (FrameOutcome::SingleFace { captured: true }, Some(capture))
    }

    /// Scores the frame only while the face is centered; otherwise the
    /// anti-spoof streak is dropped outright. Returns whether the scorer
    /// produced a result.
    fn assess_spoof(&mut self, frame: &Frame, is_centered: bool) -> bool {
        if !is_centered {
            self.state.anti_spoof.distrust();
            return false;
        }

        let result = if self.scorer.is_available() {
            let score_start = Instant::now();
            let result = match self.scorer.score(frame) {
                Ok(result) => result,
                Err(e) => {
                    log::debug!("Spoof scoring failed on frame {}: {e}", frame.index());
                    None
                }
            };
            self.logger.timing("score", elapsed_ms(score_start));
            result
        } else {
            None
        };
        self.aggregator.observe(&mut self.state.anti_spoof, result);
        result.is_some()
    }

    fn publish_liveness(&mut self, update: LivenessUpdate, now_ms: u64) {
        let generation = self.state.generation;
        let (step, blink_count) = match update {
            LivenessUpdate::Unchanged => return,
            LivenessUpdate::Started => {
                log::info!("Blink challenge started");
                (LivenessStep::BlinkChallenge, None)
            }
            LivenessUpdate::BlinkCounted { blink_count } => {
                log::debug!("Blink {blink_count} counted");
                (LivenessStep::BlinkChallenge, Some(blink_count))
            }
            LivenessUpdate::Completed { blink_count } => {
                log::info!("Blink challenge complete after {blink_count} blinks");
                (LivenessStep::Complete, Some(blink_count))
            }
        };
        let event = LivenessStepEvent {
            generation,
            step,
            blink_count,
        };
        self.publisher.publish_liveness(event, now_ms);
    }
}

/// The face's box, clamped into the frame, if it has any area.
fn usable_bounds(face: &DetectedFace) -> Option<BoundingBox> {
    face.bounds
        .map(|b| b.clamped())
        .filter(|b| !b.is_degenerate())
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
