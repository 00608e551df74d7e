//! Per-frame detection types produced by the classifier capabilities.
//!
//! These are ephemeral: produced and consumed within one sampling tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Index of the nose in the face landmark list
/// (right eye, left eye, nose, mouth, right ear, left ear).
pub const NOSE_LANDMARK: usize = 2;

/// A pixel coordinate within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Dimensions of a captured frame in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: f64,
    pub height: f64,
}

impl FrameSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

impl Default for FrameSize {
    fn default() -> Self {
        Self::new(640.0, 480.0)
    }
}

/// Handle to one captured camera frame.
///
/// Pixel data is owned by the capture backend; the core only needs the
/// geometry and the capture instant.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Sequence number assigned by the frame source
    pub index: u64,
    /// Frame geometry
    pub size: FrameSize,
    /// When the frame was captured
    pub captured_at: DateTime<Utc>,
}

/// A face located in a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    /// Top-left corner of the face box
    pub top_left: Point,
    /// Bottom-right corner of the face box
    pub bottom_right: Point,
    /// Facial landmarks, nose at [`NOSE_LANDMARK`]
    #[serde(default)]
    pub landmarks: Vec<Point>,
    /// Detection confidence (0-1)
    #[serde(default = "full_confidence")]
    pub probability: f64,
}

fn full_confidence() -> f64 {
    1.0
}

impl FaceDetection {
    /// A face box centered on `center` with a nose landmark at the same point.
    pub fn centered_at(center: Point, half_extent: f64) -> Self {
        let offset = |dx: f64, dy: f64| Point::new(center.x + dx, center.y + dy);
        Self {
            top_left: offset(-half_extent, -half_extent),
            bottom_right: offset(half_extent, half_extent),
            landmarks: vec![
                offset(-half_extent / 2.0, -half_extent / 3.0),
                offset(half_extent / 2.0, -half_extent / 3.0),
                center,
                offset(0.0, half_extent / 2.0),
                offset(-half_extent, 0.0),
                offset(half_extent, 0.0),
            ],
            probability: 1.0,
        }
    }

    /// The point compared against the frame center: the nose landmark, or
    /// the box center when landmarks are missing.
    pub fn reference_point(&self) -> Point {
        self.landmarks
            .get(NOSE_LANDMARK)
            .copied()
            .unwrap_or_else(|| {
                Point::new(
                    (self.top_left.x + self.bottom_right.x) / 2.0,
                    (self.top_left.y + self.bottom_right.y) / 2.0,
                )
            })
    }
}

/// An object box reported by the object classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDetection {
    /// Class label, e.g. "cell phone"
    pub label: String,
    /// Confidence score (0-1)
    #[serde(default = "full_confidence")]
    pub score: f64,
    /// `[x, y, width, height]`
    #[serde(default)]
    pub bbox: [f64; 4],
}

impl ObjectDetection {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
            bbox: [0.0; 4],
        }
    }
}

/// Everything the classifiers reported for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameObservation {
    #[serde(default)]
    pub faces: Vec<FaceDetection>,
    #[serde(default)]
    pub objects: Vec<ObjectDetection>,
}
