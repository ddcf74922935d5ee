use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::pipeline::frame_pipeline::FramePipeline;
use crate::session::session_event::SessionEvent;
use crate::session::session_handle::SessionHandle;
use crate::shared::frame::Frame;

const DEFAULT_CHANNEL_CAPACITY: usize = 1;

/// Millisecond time source for the frame thread.
pub trait Clock: Send {
    fn now_ms(&self) -> u64;
}

/// Milliseconds since the clock was created.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

type Submission = (Frame, Option<u64>);

/// Runs a [`FramePipeline`] on its own thread, fed by a small bounded queue.
///
/// Layout: `camera → [queue] → frame thread [detect/score/gate]`
///
/// Frames that arrive while the queue is full are dropped at the door, so
/// the detector and scorer never fall behind the camera.
pub struct ThreadedFrameExecutor {
    channel_capacity: usize,
}

impl ThreadedFrameExecutor {
    pub fn new() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn spawn(&self, pipeline: FramePipeline) -> FrameWorker {
        self.spawn_with_clock(pipeline, Box::new(MonotonicClock::new()))
    }

    pub fn spawn_with_clock(
        &self,
        mut pipeline: FramePipeline,
        clock: Box<dyn Clock>,
    ) -> FrameWorker {
        let session = pipeline.handle();
        let events = pipeline.subscribe();
        let (tx, rx) = crossbeam_channel::bounded::<Submission>(self.channel_capacity);

        let handle = std::thread::spawn(move || {
            for (frame, at) in rx {
                let now_ms = at.unwrap_or_else(|| clock.now_ms());
                pipeline.process_frame(frame, now_ms);
            }
            pipeline
        });

        FrameWorker {
            tx: Some(tx),
            handle: Some(handle),
            session,
            events,
        }
    }
}

impl Default for ThreadedFrameExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer-side handle on a running frame thread.
pub struct FrameWorker {
    tx: Option<Sender<Submission>>,
    handle: Option<JoinHandle<FramePipeline>>,
    session: SessionHandle,
    events: Receiver<SessionEvent>,
}

impl FrameWorker {
    /// Offers a frame stamped with the frame thread's clock. Returns `false`
    /// (and releases the frame) if the thread is still busy.
    pub fn submit(&self, frame: Frame) -> bool {
        self.offer((frame, None))
    }

    /// Offers a frame with an explicit processing time, for replays.
    pub fn submit_at(&self, frame: Frame, now_ms: u64) -> bool {
        self.offer((frame, Some(now_ms)))
    }

    pub fn session(&self) -> SessionHandle {
        self.session.clone()
    }

    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.events.clone()
    }

    /// Closes the queue, lets the thread finish queued frames and hands the
    /// pipeline back. `None` if the frame thread panicked.
    pub fn shutdown(mut self) -> Option<FramePipeline> {
        self.stop()
    }

    fn offer(&self, submission: Submission) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        match tx.try_send(submission) {
            Ok(()) => true,
            Err(TrySendError::Full((frame, _))) => {
                log::trace!("Frame {} dropped: frame thread busy", frame.index());
                false
            }
            Err(TrySendError::Disconnected((frame, _))) => {
                log::debug!("Frame {} dropped: frame thread gone", frame.index());
                false
            }
        }
    }

    fn stop(&mut self) -> Option<FramePipeline> {
        drop(self.tx.take());
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(pipeline) => Some(pipeline),
            Err(_) => {
                log::warn!("Frame thread panicked");
                None
            }
        }
    }
}

impl Drop for FrameWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_detector::{DetectedFace, FaceDetector};
    use crate::detection::domain::spoof_scorer::RawSpoofResult;
    use crate::detection::infrastructure::replay_face_detector::ReplayFaceDetector;
    use crate::detection::infrastructure::replay_spoof_scorer::ReplaySpoofScorer;
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::thresholds::SessionConfig;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Arc;

    fn live() -> RawSpoofResult {
        RawSpoofResult {
            laplacian_score: 5000.0,
            confidence: 0.9,
            combined_score: 0.8,
        }
    }

    fn replay_pipeline(frames: usize) -> FramePipeline {
        let face = DetectedFace::with_bounds(BoundingBox::new(270.0, 190.0, 100.0, 100.0));
        let faces: HashMap<_, _> = (0..frames).map(|i| (i, vec![face.clone()])).collect();
        let scores: HashMap<_, _> = (0..frames).map(|i| (i, live())).collect();
        FramePipeline::new(
            SessionConfig::default(),
            Box::new(ReplayFaceDetector::new(Arc::new(faces))),
            Box::new(ReplaySpoofScorer::new(Arc::new(scores))),
        )
        .unwrap()
    }

    /// Blocks in `detect` until released, reporting each frame it starts.
    struct GatedDetector {
        started: Sender<usize>,
        release: Receiver<()>,
    }

    impl FaceDetector for GatedDetector {
        fn detect(
            &mut self,
            frame: &Frame,
        ) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>> {
            let _ = self.started.send(frame.index());
            let _ = self.release.recv();
            Ok(Vec::new())
        }
    }

    struct SteppingClock {
        next: AtomicU64,
        step: u64,
    }

    impl Clock for SteppingClock {
        fn now_ms(&self) -> u64 {
            self.next.fetch_add(self.step, Ordering::SeqCst)
        }
    }

    fn counted_frame(index: usize, released: &Arc<AtomicUsize>) -> Frame {
        let counter = released.clone();
        Frame::metadata_only(640, 480, index).with_release_hook(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_replayed_frames_reach_capture() {
        let worker = ThreadedFrameExecutor::new()
            .with_channel_capacity(8)
            .spawn(replay_pipeline(4));
        let events = worker.subscribe();

        for i in 0..4 {
            assert!(worker.submit_at(Frame::metadata_only(640, 480, i), i as u64 * 500));
        }
        let pipeline = worker.shutdown().unwrap();

        assert!(pipeline.state().is_captured());
        assert!(events
            .try_iter()
            .any(|e| matches!(e, SessionEvent::Captured(_))));
    }

    #[test]
    fn test_clock_stamps_unstamped_frames() {
        let clock = SteppingClock {
            next: AtomicU64::new(0),
            step: 500,
        };
        let worker = ThreadedFrameExecutor::new()
            .with_channel_capacity(8)
            .spawn_with_clock(replay_pipeline(4), Box::new(clock));
        let session = worker.session();

        for i in 0..4 {
            assert!(worker.submit(Frame::metadata_only(640, 480, i)));
        }
        let pipeline = worker.shutdown().unwrap();

        assert_eq!(pipeline.state().last_processed_at_ms, Some(1500));
        assert!(session.is_captured());
    }

    #[test]
    fn test_busy_thread_drops_and_releases_frames() {
        let (started_tx, started_rx) = crossbeam_channel::unbounded();
        let (release_tx, release_rx) = crossbeam_channel::unbounded::<()>();
        let detector = GatedDetector {
            started: started_tx,
            release: release_rx,
        };
        let pipeline = FramePipeline::new(
            SessionConfig::default(),
            Box::new(detector),
            Box::new(ReplaySpoofScorer::new(Arc::new(HashMap::new()))),
        )
        .unwrap();
        let worker = ThreadedFrameExecutor::new().spawn(pipeline);
        let released = Arc::new(AtomicUsize::new(0));

        assert!(worker.submit_at(counted_frame(0, &released), 0));
        assert_eq!(started_rx.recv().unwrap(), 0);

        // Frame 0 is in detection; one slot is free.
        assert!(worker.submit_at(counted_frame(1, &released), 1_000));
        assert!(!worker.submit_at(counted_frame(2, &released), 2_000));
        assert_eq!(released.load(Ordering::SeqCst), 1);

        drop(release_tx);
        worker.shutdown().unwrap();

        assert_eq!(released.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_reset_during_detection_supersedes_in_flight_frame() {
        let (started_tx, started_rx) = crossbeam_channel::unbounded();
        let (release_tx, release_rx) = crossbeam_channel::unbounded::<()>();
        let detector = GatedDetector {
            started: started_tx,
            release: release_rx,
        };
        let pipeline = FramePipeline::new(
            SessionConfig::default(),
            Box::new(detector),
            Box::new(ReplaySpoofScorer::new(Arc::new(HashMap::new()))),
        )
        .unwrap();
        let worker = ThreadedFrameExecutor::new().spawn(pipeline);
        let session = worker.session();
        let events = worker.subscribe();

        assert!(worker.submit_at(Frame::metadata_only(640, 480, 0), 0));
        assert_eq!(started_rx.recv().unwrap(), 0);
        session.soft_reset();
        release_tx.send(()).unwrap();

        let in_flight = events.recv().unwrap();
        assert_eq!(in_flight.generation(), 0);
        assert!(!session.is_current(in_flight.generation()));

        assert!(worker.submit_at(Frame::metadata_only(640, 480, 1), 1_000));
        assert_eq!(started_rx.recv().unwrap(), 1);
        release_tx.send(()).unwrap();
        let pipeline = worker.shutdown().unwrap();

        let next = events.try_recv().unwrap();
        assert_eq!(next.generation(), 1);
        assert!(session.is_current(next.generation()));
        assert_eq!(pipeline.state().generation, 1);
        assert_eq!(pipeline.state().last_processed_at_ms, Some(1_000));
        assert_eq!(*session.snapshot(), *pipeline.state());
    }

    #[test]
    fn test_capacity_is_at_least_one() {
        let executor = ThreadedFrameExecutor::new().with_channel_capacity(0);
        assert_eq!(executor.channel_capacity, 1);
    }

    #[test]
    fn test_monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::default();
        let first = clock.now_ms();
        let second = clock.now_ms();
        assert!(second >= first);
    }

    #[test]
    fn test_dropping_worker_joins_thread() {
        let worker = ThreadedFrameExecutor::new().spawn(replay_pipeline(1));
        let session = worker.session();
        assert!(worker.submit_at(Frame::metadata_only(640, 480, 0), 0));
        drop(worker);

        assert_eq!(session.snapshot().tracking.stable_count, 1);
    }
}
