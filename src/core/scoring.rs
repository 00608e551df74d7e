//! Integrity scoring over a session's event log.

use crate::core::events::{Event, EventCategory};
use serde::{Deserialize, Serialize};

/// Points deducted per focus-lost event.
pub const FOCUS_LOST_PENALTY: u64 = 5;
/// Points deducted per suspicious event.
pub const SUSPICIOUS_PENALTY: u64 = 10;
/// Score of a session with no deductions.
pub const MAX_SCORE: u64 = 100;

/// Derived view of a session's behavior. Recomputed on demand, never
/// authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub duration_seconds: u64,
    pub focus_lost_count: u64,
    pub suspicious_count: u64,
    /// Capped at [`MAX_SCORE`]
    pub deductions: u64,
    /// 0-100 inclusive
    pub integrity_score: u64,
    /// Full chronological event list
    pub events: Vec<Event>,
}

impl IntegrityReport {
    pub fn duration_minutes(&self) -> u64 {
        self.duration_seconds / 60
    }

    /// Seconds past the last whole minute.
    pub fn duration_remainder_seconds(&self) -> u64 {
        self.duration_seconds % 60
    }

    /// Plain-text rendering for terminals.
    pub fn render(&self, candidate_name: &str) -> String {
        let mut out = format!(
            "Proctoring Report\n\
             =================\n\
             Candidate Name: {}\n\
             Interview Duration: {} minutes {} seconds\n\
             Focus Lost Events: {}\n\
             Suspicious Events: {}\n\
             Final Integrity Score: {}/{}\n\
             \n\
             Event Log\n",
            candidate_name,
            self.duration_minutes(),
            self.duration_remainder_seconds(),
            self.focus_lost_count,
            self.suspicious_count,
            self.integrity_score,
            MAX_SCORE,
        );
        for event in &self.events {
            out.push_str(&format!(
                "  {} - {}\n",
                event.timestamp.to_rfc3339(),
                event.message
            ));
        }
        out
    }
}

/// Deductions for the given counts, capped at [`MAX_SCORE`].
pub fn deductions(focus_lost_count: u64, suspicious_count: u64) -> u64 {
    focus_lost_count
        .saturating_mul(FOCUS_LOST_PENALTY)
        .saturating_add(suspicious_count.saturating_mul(SUSPICIOUS_PENALTY))
        .min(MAX_SCORE)
}

/// Score for the given counts; always within `0..=100`.
pub fn integrity_score(focus_lost_count: u64, suspicious_count: u64) -> u64 {
    MAX_SCORE - deductions(focus_lost_count, suspicious_count)
}

/// Fold an event log into a report. Pure and deterministic.
pub fn score(events: &[Event], duration_seconds: u64) -> IntegrityReport {
    let count = |category: EventCategory| {
        events.iter().filter(|e| e.category() == category).count() as u64
    };
    let focus_lost_count = count(EventCategory::FocusLost);
    let suspicious_count = count(EventCategory::Suspicious);

    let mut events = events.to_vec();
    events.sort_by_key(|e| e.timestamp);

    IntegrityReport {
        duration_seconds,
        focus_lost_count,
        suspicious_count,
        deductions: deductions(focus_lost_count, suspicious_count),
        integrity_score: integrity_score(focus_lost_count, suspicious_count),
        events,
    }
}
