use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// One face reported by the detector for a frame.
///
/// `bounds` is optional because some detectors emit a face record whose
/// geometry could not be resolved; the pipeline treats those as no face.
/// Eye-open probabilities are only present when classification is enabled.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectedFace {
    pub bounds: Option<BoundingBox>,
    pub left_eye_open: Option<f64>,
    pub right_eye_open: Option<f64>,
}

impl DetectedFace {
    pub fn with_bounds(bounds: BoundingBox) -> Self {
        Self {
            bounds: Some(bounds),
            ..Self::default()
        }
    }

    pub fn with_eyes(mut self, left: f64, right: f64) -> Self {
        self.left_eye_open = Some(left);
        self.right_eye_open = Some(right);
        self
    }
}

/// Domain interface for face detection.
///
/// Implementations may be stateful (e.g., tracking across frames),
/// hence `&mut self`. Called at most once per processed frame.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>>;
}
