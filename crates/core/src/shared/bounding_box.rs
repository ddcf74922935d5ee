use serde::{Deserialize, Serialize};

/// Axis-aligned face box in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Detectors may report boxes hanging off the top/left edge; those
    /// coordinates (and any negative extent) are pinned to zero.
    pub fn clamped(&self) -> Self {
        Self {
            x: self.x.max(0.0),
            y: self.y.max(0.0),
            width: self.width.max(0.0),
            height: self.height.max(0.0),
        }
    }

    /// True when the box carries no usable area (or non-finite values).
    pub fn is_degenerate(&self) -> bool {
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        !finite || self.width <= 0.0 || self.height <= 0.0
    }

    /// Whether the top-left corner moved strictly less than `threshold`
    /// on both axes relative to `previous`.
    pub fn moved_less_than(&self, previous: &BoundingBox, threshold: f64) -> bool {
        (self.x - previous.x).abs() < threshold && (self.y - previous.y).abs() < threshold
    }
}
