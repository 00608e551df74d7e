//! Core detection and scoring logic.
//!
//! This module contains:
//! - The debounce timer shared by the focus conditions
//! - Focus and object trackers that turn detections into events
//! - The append-only event log
//! - Integrity scoring over an event log

pub mod dwell;
pub mod events;
pub mod focus;
pub mod objects;
pub mod scoring;

// Re-export commonly used types
pub use dwell::{DwellState, DwellTimer, Transition};
pub use events::{
    Detected, Event, EventCategory, EventKind, EventListener, EventLog, EventRecord, InterviewId,
};
pub use focus::{FocusTracker, TrackerState};
pub use objects::{ObjectTracker, DEFAULT_UNAUTHORIZED_ITEMS};
pub use scoring::{score, IntegrityReport};
