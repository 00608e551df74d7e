//! Frame classifier adapter.
//!
//! Wraps the camera and the two detection capabilities (face localization
//! and object detection) behind one uniform per-frame call. Implementations
//! are synchronous and may block for the duration of inference; the session
//! runner moves each call onto the blocking pool.

pub mod scripted;
pub mod types;

use crate::error::ClassifierError;
use std::sync::Arc;

// Re-export commonly used types
pub use scripted::{Recording, ScriptedClassifier};
pub use types::{
    FaceDetection, Frame, FrameObservation, FrameSize, ObjectDetection, Point, NOSE_LANDMARK,
};

/// Camera capture.
pub trait FrameSource: Send + Sync {
    fn capture_frame(&self) -> Result<Frame, ClassifierError>;

    /// Fails when the camera cannot be opened.
    fn check_available(&self) -> Result<(), ClassifierError> {
        Ok(())
    }
}

/// Face localization model.
pub trait FaceClassifier: Send + Sync {
    fn estimate_faces(&self, frame: &Frame) -> Result<Vec<FaceDetection>, ClassifierError>;

    fn check_loaded(&self) -> Result<(), ClassifierError> {
        Ok(())
    }
}

/// Object detection model.
pub trait ObjectClassifier: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Vec<ObjectDetection>, ClassifierError>;

    fn check_loaded(&self) -> Result<(), ClassifierError> {
        Ok(())
    }
}

/// Result of classifying one captured frame.
#[derive(Debug, Clone)]
pub struct ClassifiedFrame {
    pub frame: Frame,
    pub observation: FrameObservation,
}

/// Uniform per-frame access to the capture and detection capabilities.
#[derive(Clone)]
pub struct FrameClassifier {
    source: Arc<dyn FrameSource>,
    faces: Arc<dyn FaceClassifier>,
    objects: Arc<dyn ObjectClassifier>,
}

impl FrameClassifier {
    pub fn new(
        source: Arc<dyn FrameSource>,
        faces: Arc<dyn FaceClassifier>,
        objects: Arc<dyn ObjectClassifier>,
    ) -> Self {
        Self {
            source,
            faces,
            objects,
        }
    }

    /// Build an adapter from one backend that provides all three capabilities.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: FrameSource + FaceClassifier + ObjectClassifier + 'static,
    {
        Self {
            source: backend.clone(),
            faces: backend.clone(),
            objects: backend,
        }
    }

    /// Verify the camera and both models before a session starts.
    pub fn ensure_ready(&self) -> Result<(), ClassifierError> {
        self.source.check_available()?;
        self.faces.check_loaded()?;
        self.objects.check_loaded()?;
        Ok(())
    }

    /// Capture a frame and run both classifiers over it.
    pub fn classify(&self) -> Result<ClassifiedFrame, ClassifierError> {
        let frame = self.source.capture_frame()?;
        let faces = self.faces.estimate_faces(&frame)?;
        let objects = self.objects.detect(&frame)?;

        Ok(ClassifiedFrame {
            frame,
            observation: FrameObservation { faces, objects },
        })
    }
}

impl std::fmt::Debug for FrameClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameClassifier").finish_non_exhaustive()
    }
}
