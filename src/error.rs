//! Error types for the proctor agent.

use thiserror::Error;

/// Input rejected before any session state changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter candidate name")]
    MissingCandidateName,

    #[error("An interview is already in progress ({0})")]
    SessionAlreadyActive(String),
}

/// Failure of a frame source or classifier capability.
#[derive(Debug, Clone, Error)]
pub enum ClassifierError {
    #[error("Camera unavailable: {0}")]
    Camera(String),

    #[error("Model not loaded: {0}")]
    ModelNotLoaded(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Errors surfaced by the session-facing API.
#[derive(Debug, Error)]
pub enum ProctorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Models or camera could not be initialized; the session stays idle.
    #[error("Error loading models: {0}")]
    ClassifierUnavailable(ClassifierError),

    #[error("No interview has been started")]
    NoSession,

    #[error("Tick failed: {0}")]
    Classifier(#[from] ClassifierError),
}

/// Failure delivering a record to the storage backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Gateway config error: {0}")]
    Config(String),

    #[error("Gateway network error: {0}")]
    Network(String),

    #[error("Gateway server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Gateway serialization error: {0}")]
    Serialization(String),
}
