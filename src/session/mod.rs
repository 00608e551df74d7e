//! Interview sessions.
//!
//! - [`SessionController`]: synchronous `Idle -> Active -> Ended` state
//!   machine that feeds detections through the trackers into the event log
//! - [`Proctor`]: async runner that drives the controller from a
//!   fixed-interval sampling loop

pub mod controller;
pub mod runner;

use crate::core::events::InterviewId;
use crate::core::scoring::IntegrityReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

pub use controller::SessionController;
pub use runner::Proctor;

/// One monitored interview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub interview_id: InterviewId,
    pub candidate_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Session {
    /// Whole seconds between start and `end_time` (or `now` while running),
    /// rounded to nearest.
    pub fn duration_seconds(&self, now: DateTime<Utc>) -> u64 {
        let end = self.end_time.unwrap_or(now);
        let millis = (end - self.start_time).num_milliseconds().max(0) as u64;
        (millis + 500) / 1000
    }
}

/// Lifecycle of the controller's current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active(Session),
    Ended(Session),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Idle => None,
            SessionState::Active(s) | SessionState::Ended(s) => Some(s),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active(_))
    }
}

/// Interview summary as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewSummary {
    pub interview_id: String,
    pub candidate_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Seconds
    pub duration: u64,
    pub focus_events: u64,
    pub object_events: u64,
    pub integrity_score: u64,
}

impl InterviewSummary {
    pub fn new(session: &Session, report: &IntegrityReport, now: DateTime<Utc>) -> Self {
        Self {
            interview_id: session.interview_id.to_string(),
            candidate_name: session.candidate_name.clone(),
            start_time: session.start_time,
            end_time: session.end_time.unwrap_or(now),
            duration: report.duration_seconds,
            focus_events: report.focus_lost_count,
            object_events: report.suspicious_count,
            integrity_score: report.integrity_score,
        }
    }
}

static LAST_INTERVIEW_ID: AtomicI64 = AtomicI64::new(0);

/// Millisecond-timestamp id, bumped past the last issued one so ids stay
/// unique within the process even when two sessions start in the same
/// millisecond.
pub fn next_interview_id(now: DateTime<Utc>) -> InterviewId {
    let candidate = now.timestamp_millis();
    let previous = LAST_INTERVIEW_ID
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(candidate.max(last + 1))
        })
        .unwrap_or(candidate);
    InterviewId::new(candidate.max(previous + 1).to_string())
}
