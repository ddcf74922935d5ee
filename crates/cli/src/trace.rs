use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use facegate_core::detection::domain::face_detector::DetectedFace;
use facegate_core::detection::domain::spoof_scorer::RawSpoofResult;
use facegate_core::detection::infrastructure::replay_face_detector::ReplayFaceDetector;
use facegate_core::detection::infrastructure::replay_spoof_scorer::ReplaySpoofScorer;
use facegate_core::shared::bounding_box::BoundingBox;
use facegate_core::shared::frame::Frame;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to read trace {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid trace record on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("trace {0} contains no frames")]
    Empty(PathBuf),
}

#[derive(Debug, Clone, Deserialize)]
pub struct TraceFace {
    pub bounds: Option<BoundingBox>,
    #[serde(default)]
    pub left_eye_open: Option<f64>,
    #[serde(default)]
    pub right_eye_open: Option<f64>,
}

impl From<TraceFace> for DetectedFace {
    fn from(face: TraceFace) -> Self {
        DetectedFace {
            bounds: face.bounds,
            left_eye_open: face.left_eye_open,
            right_eye_open: face.right_eye_open,
        }
    }
}

/// One recorded camera frame: what the detector and scorer reported for it.
#[derive(Debug, Clone, Deserialize)]
pub struct TraceFrame {
    /// Defaults to the record's position in the trace.
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub timestamp_ms: Option<u64>,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub faces: Vec<TraceFace>,
    #[serde(default)]
    pub spoof: Option<RawSpoofResult>,
    #[serde(default)]
    pub detector_error: bool,
    #[serde(default)]
    pub scorer_error: bool,
}

impl TraceFrame {
    pub fn index(&self) -> usize {
        self.index.unwrap_or_default()
    }

    pub fn to_frame(&self) -> Frame {
        let frame = Frame::metadata_only(self.width, self.height, self.index());
        match self.timestamp_ms {
            Some(ts) => frame.with_timestamp_ms(ts),
            None => frame,
        }
    }
}

/// Reads a JSON-lines trace, one frame per non-blank line.
pub fn read_trace(path: &Path) -> Result<Vec<TraceFrame>, TraceError> {
    let file = File::open(path).map_err(|source| TraceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let frames = parse_trace(BufReader::new(file), path)?;
    if frames.is_empty() {
        return Err(TraceError::Empty(path.to_path_buf()));
    }
    Ok(frames)
}

pub fn parse_trace(reader: impl BufRead, path: &Path) -> Result<Vec<TraceFrame>, TraceError> {
    let mut frames = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| TraceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let mut frame: TraceFrame =
            serde_json::from_str(&line).map_err(|source| TraceError::Parse {
                line: i + 1,
                source,
            })?;
        frame.index.get_or_insert(frames.len());
        frames.push(frame);
    }
    Ok(frames)
}

/// Builds replay detector and scorer serving the recorded results.
pub fn replay_sources(frames: &[TraceFrame]) -> (ReplayFaceDetector, ReplaySpoofScorer) {
    let mut faces = HashMap::new();
    let mut scores = HashMap::new();
    let mut detector_failures = HashSet::new();
    let mut scorer_failures = HashSet::new();

    for frame in frames {
        let index = frame.index();
        let detected: Vec<DetectedFace> = frame.faces.iter().cloned().map(Into::into).collect();
        faces.insert(index, detected);
        if let Some(spoof) = frame.spoof {
            scores.insert(index, spoof);
        }
        if frame.detector_error {
            detector_failures.insert(index);
        }
        if frame.scorer_error {
            scorer_failures.insert(index);
        }
    }

    (
        ReplayFaceDetector::new(Arc::new(faces)).with_failures(detector_failures),
        ReplaySpoofScorer::new(Arc::new(scores)).with_failures(scorer_failures),
    )
}
