//! Integrity events and the append-only event log.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

/// Identifier of one interview session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterviewId(String);

impl InterviewId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InterviewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How an event counts toward the integrity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    /// Candidate looked away or left the frame
    FocusLost,
    /// Extra people or unauthorized items
    Suspicious,
    /// Lifecycle and recovery notices; never scored
    Informational,
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SessionStarted,
    SessionEnded,
    LookingAway,
    LookingBack,
    FaceMissing,
    FaceReturned,
    MultipleFaces,
    UnauthorizedItems,
}

impl EventKind {
    pub fn category(self) -> EventCategory {
        match self {
            EventKind::LookingAway | EventKind::FaceMissing => EventCategory::FocusLost,
            EventKind::MultipleFaces | EventKind::UnauthorizedItems => EventCategory::Suspicious,
            EventKind::SessionStarted
            | EventKind::SessionEnded
            | EventKind::LookingBack
            | EventKind::FaceReturned => EventCategory::Informational,
        }
    }

    /// Classify a stored message that carries no kind tag.
    ///
    /// Only for records written before kinds were persisted; live events
    /// always carry their kind.
    pub fn from_message(message: &str) -> Option<Self> {
        let kind = if message.contains("looking away") {
            EventKind::LookingAway
        } else if message.contains("No face detected") {
            EventKind::FaceMissing
        } else if message.contains("Multiple faces") {
            EventKind::MultipleFaces
        } else if message.contains("Unauthorized items") {
            EventKind::UnauthorizedItems
        } else if message.contains("looking at screen again") {
            EventKind::LookingBack
        } else if message.contains("Face detected again") {
            EventKind::FaceReturned
        } else if message.starts_with("Interview started") {
            EventKind::SessionStarted
        } else if message.starts_with("Interview ended") {
            EventKind::SessionEnded
        } else {
            return None;
        };
        Some(kind)
    }
}

/// An event emitted by a tracker before it is bound to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detected {
    pub kind: EventKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Detected {
    pub fn new(kind: EventKind, message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            kind,
            message: message.into(),
            at,
        }
    }
}

/// An immutable entry in a session's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub interview_id: InterviewId,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
}

impl Event {
    pub fn new(interview_id: InterviewId, detected: Detected) -> Self {
        Self {
            interview_id,
            timestamp: detected.at,
            message: detected.message,
            kind: detected.kind,
        }
    }

    pub fn category(&self) -> EventCategory {
        self.kind.category()
    }

    /// `HH:MM:SS - message`, as shown in the live event list.
    pub fn display_line(&self) -> String {
        format!("{} - {}", self.timestamp.format("%H:%M:%S"), self.message)
    }

    /// Wire form sent to the storage backend.
    pub fn to_record(&self) -> EventRecord {
        EventRecord {
            interview_id: self.interview_id.as_str().to_string(),
            timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            message: self.message.clone(),
            kind: Some(self.kind),
        }
    }
}

/// Event as exchanged with the storage backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub interview_id: String,
    /// ISO-8601 timestamp
    pub timestamp: String,
    pub message: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EventKind>,
}

impl EventRecord {
    /// Parse the record back into an event.
    ///
    /// Returns `None` when the timestamp is malformed or the message cannot
    /// be classified.
    pub fn to_event(&self) -> Option<Event> {
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()?
            .with_timezone(&Utc);
        let kind = self.kind.or_else(|| EventKind::from_message(&self.message))?;

        Some(Event {
            interview_id: InterviewId::new(self.interview_id.clone()),
            timestamp,
            message: self.message.clone(),
            kind,
        })
    }
}

/// Callback fired for every appended event.
pub type EventListener = Arc<dyn Fn(&Event) + Send + Sync>;

/// Append-only, time-ordered record of session events.
///
/// Appends are O(1); ordering by timestamp is established at read time, with
/// insertion order breaking ties.
#[derive(Default)]
pub struct EventLog {
    events: RwLock<Vec<Event>>,
    listeners: RwLock<Vec<EventListener>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback fired synchronously on each append.
    pub fn on_event(&self, listener: impl Fn(&Event) + Send + Sync + 'static) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    pub fn append(&self, event: Event) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());

        // Listeners run outside the events lock so they may query the log.
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener(&event);
        }
    }

    /// Events of one interview, sorted by timestamp ascending.
    pub fn query(&self, interview_id: &InterviewId) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| &e.interview_id == interview_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps.
        events.sort_by_key(|e| e.timestamp);
        events
    }

    pub fn len(&self) -> usize {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all events. Listeners stay registered.
    pub fn clear(&self) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("events", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event(id: &InterviewId, at: DateTime<Utc>, message: &str) -> Event {
        Event::new(
            id.clone(),
            Detected::new(EventKind::MultipleFaces, message, at),
        )
    }

    #[test]
    fn test_query_sorts_by_timestamp_with_stable_ties() {
        let log = EventLog::new();
        let id = InterviewId::new("1");
        let t0 = Utc::now();

        log.append(event(&id, t0 + Duration::seconds(2), "late"));
        log.append(event(&id, t0, "first tie"));
        log.append(event(&id, t0, "second tie"));

        let messages: Vec<String> = log.query(&id).into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["first tie", "second tie", "late"]);
    }

    #[test]
    fn test_query_filters_by_interview() {
        let log = EventLog::new();
        let a = InterviewId::new("a");
        let b = InterviewId::new("b");
        let now = Utc::now();

        log.append(event(&a, now, "for a"));
        log.append(event(&b, now, "for b"));

        assert_eq!(log.query(&a).len(), 1);
        assert_eq!(log.query(&b)[0].message, "for b");
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_listener_fires_per_append_and_can_read_log() {
        let log = Arc::new(EventLog::new());
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = seen.clone();
        let reader = log.clone();
        log.on_event(move |e| {
            counter.fetch_add(1, Ordering::SeqCst);
            assert!(!reader.query(&e.interview_id).is_empty());
        });

        let id = InterviewId::new("x");
        log.append(event(&id, Utc::now(), "one"));
        log.append(event(&id, Utc::now(), "two"));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_kind_categories() {
        assert_eq!(EventKind::LookingAway.category(), EventCategory::FocusLost);
        assert_eq!(EventKind::FaceMissing.category(), EventCategory::FocusLost);
        assert_eq!(EventKind::MultipleFaces.category(), EventCategory::Suspicious);
        assert_eq!(EventKind::UnauthorizedItems.category(), EventCategory::Suspicious);
        assert_eq!(EventKind::LookingBack.category(), EventCategory::Informational);
        assert_eq!(EventKind::SessionEnded.category(), EventCategory::Informational);
    }

    #[test]
    fn test_legacy_messages_are_classified() {
        assert_eq!(
            EventKind::from_message("User looking away for more than 5 seconds"),
            Some(EventKind::LookingAway)
        );
        assert_eq!(
            EventKind::from_message("User looking at screen again"),
            Some(EventKind::LookingBack)
        );
        assert_eq!(
            EventKind::from_message("Unauthorized items detected: book"),
            Some(EventKind::UnauthorizedItems)
        );
        assert_eq!(EventKind::from_message("something else"), None);
    }

    #[test]
    fn test_record_wire_shape() {
        let id = InterviewId::new("1700000000000");
        let at = DateTime::parse_from_rfc3339("2024-01-22T10:00:01Z")
            .unwrap()
            .with_timezone(&Utc);
        let record = event(&id, at, "Multiple faces detected (2)").to_record();

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["interviewId"], "1700000000000");
        assert_eq!(json["timestamp"], "2024-01-22T10:00:01.000Z");
        assert_eq!(json["type"], "multiple_faces");

        let untagged = EventRecord {
            kind: None,
            ..record
        };
        let parsed = untagged.to_event().unwrap();
        assert_eq!(parsed.kind, EventKind::MultipleFaces);
        assert_eq!(parsed.timestamp, at);
    }
}
