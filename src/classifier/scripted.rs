//! Recorded detections played back as a classifier backend.
//!
//! A [`Recording`] holds the per-tick detections of a past session. The
//! [`ScriptedClassifier`] serves them one frame per capture, which lets the
//! full pipeline run without a camera or models.

use crate::classifier::types::{
    FaceDetection, Frame, FrameObservation, FrameSize, ObjectDetection,
};
use crate::classifier::{FaceClassifier, FrameSource, ObjectClassifier};
use crate::error::ClassifierError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-tick detections captured from a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recording {
    /// Geometry of every frame in the recording
    #[serde(default)]
    pub frame_size: FrameSize,
    /// One observation per sampling tick
    pub frames: Vec<FrameObservation>,
}

impl Recording {
    pub fn new(frame_size: FrameSize, frames: Vec<FrameObservation>) -> Self {
        Self { frame_size, frames }
    }

    /// Load a recording from a JSON file.
    pub fn load(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(std::io::Error::other)
    }
}

/// Classifier backend that plays a [`Recording`] back frame by frame.
#[derive(Debug)]
pub struct ScriptedClassifier {
    recording: Recording,
    next_frame: AtomicU64,
    unavailable: Option<String>,
}

impl ScriptedClassifier {
    pub fn new(recording: Recording) -> Self {
        Self {
            recording,
            next_frame: AtomicU64::new(0),
            unavailable: None,
        }
    }

    /// A backend whose models never load.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            recording: Recording::default(),
            next_frame: AtomicU64::new(0),
            unavailable: Some(reason.into()),
        }
    }

    /// Number of frames not yet captured.
    pub fn remaining(&self) -> usize {
        let served = self.next_frame.load(Ordering::SeqCst) as usize;
        self.recording.frames.len().saturating_sub(served)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// True once a capture past the last frame has been attempted. For a
    /// caller that classifies frames one at a time, every recorded frame has
    /// then been fully processed.
    pub fn has_run_out(&self) -> bool {
        self.next_frame.load(Ordering::SeqCst) as usize > self.recording.frames.len()
    }

    fn observation(&self, frame: &Frame) -> Result<&FrameObservation, ClassifierError> {
        self.recording
            .frames
            .get(frame.index as usize)
            .ok_or_else(|| ClassifierError::Inference(format!("unknown frame {}", frame.index)))
    }
}

impl FrameSource for ScriptedClassifier {
    fn capture_frame(&self) -> Result<Frame, ClassifierError> {
        let index = self.next_frame.fetch_add(1, Ordering::SeqCst);
        if index as usize >= self.recording.frames.len() {
            return Err(ClassifierError::Camera("recording exhausted".to_string()));
        }

        Ok(Frame {
            index,
            size: self.recording.frame_size,
            captured_at: Utc::now(),
        })
    }

    fn check_available(&self) -> Result<(), ClassifierError> {
        match &self.unavailable {
            Some(reason) => Err(ClassifierError::Camera(reason.clone())),
            None => Ok(()),
        }
    }
}

impl FaceClassifier for ScriptedClassifier {
    fn estimate_faces(&self, frame: &Frame) -> Result<Vec<FaceDetection>, ClassifierError> {
        Ok(self.observation(frame)?.faces.clone())
    }

    fn check_loaded(&self) -> Result<(), ClassifierError> {
        match &self.unavailable {
            Some(reason) => Err(ClassifierError::ModelNotLoaded(reason.clone())),
            None => Ok(()),
        }
    }
}

impl ObjectClassifier for ScriptedClassifier {
    fn detect(&self, frame: &Frame) -> Result<Vec<ObjectDetection>, ClassifierError> {
        Ok(self.observation(frame)?.objects.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::types::Point;
    use crate::classifier::FrameClassifier;
    use std::sync::Arc;

    fn two_frame_recording() -> Recording {
        let size = FrameSize::new(640.0, 480.0);
        Recording::new(
            size,
            vec![
                FrameObservation {
                    faces: vec![FaceDetection::centered_at(size.center(), 60.0)],
                    objects: Vec::new(),
                },
                FrameObservation {
                    faces: Vec::new(),
                    objects: vec![ObjectDetection::new("book", 0.8)],
                },
            ],
        )
    }

    #[test]
    fn test_plays_frames_in_order() {
        let classifier = FrameClassifier::from_backend(Arc::new(ScriptedClassifier::new(
            two_frame_recording(),
        )));

        let first = classifier.classify().unwrap();
        assert_eq!(first.frame.index, 0);
        assert_eq!(first.observation.faces.len(), 1);
        assert_eq!(
            first.observation.faces[0].reference_point(),
            Point::new(320.0, 240.0)
        );

        let second = classifier.classify().unwrap();
        assert!(second.observation.faces.is_empty());
        assert_eq!(second.observation.objects[0].label, "book");
    }

    #[test]
    fn test_exhausted_recording_fails_capture() {
        let backend = Arc::new(ScriptedClassifier::new(two_frame_recording()));
        let classifier = FrameClassifier::from_backend(backend.clone());

        assert_eq!(backend.remaining(), 2);
        classifier.classify().unwrap();
        classifier.classify().unwrap();
        assert!(backend.is_exhausted());
        // The last frame was served but no capture has gone past it yet.
        assert!(!backend.has_run_out());
        assert!(matches!(
            classifier.classify(),
            Err(ClassifierError::Camera(_))
        ));
        assert!(backend.has_run_out());
    }

    #[test]
    fn test_unavailable_backend_is_not_ready() {
        let classifier = FrameClassifier::from_backend(Arc::new(ScriptedClassifier::unavailable(
            "no webcam",
        )));
        assert!(classifier.ensure_ready().is_err());
    }
}
