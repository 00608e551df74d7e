//! End-to-end session tests on a virtual clock.

use chrono::{DateTime, Duration, Utc};
use pretty_assertions::assert_eq;
use proctor_agent::classifier::{FaceDetection, FrameSize, ObjectDetection, Point};
use proctor_agent::clock::ManualClock;
use proctor_agent::{Config, Event, EventKind, FrameObservation, InterviewId, SessionController};
use std::sync::{Arc, Mutex};

const FRAME: FrameSize = FrameSize {
    width: 640.0,
    height: 480.0,
};

struct Harness {
    clock: Arc<ManualClock>,
    controller: SessionController,
    interview_id: InterviewId,
    start: DateTime<Utc>,
}

impl Harness {
    fn start(candidate: &str) -> Self {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let mut controller = SessionController::new(&Config::default(), clock.clone());
        let interview_id = controller.start(candidate).unwrap();
        Self {
            clock,
            controller,
            interview_id,
            start,
        }
    }

    /// Advance one second and feed a frame.
    fn tick(&mut self, observation: &FrameObservation) -> Vec<Event> {
        self.clock.advance(Duration::seconds(1));
        self.controller.observe(&self.interview_id, FRAME, observation)
    }

    /// Let time pass with no frame classified, as when ticks fail.
    fn miss(&mut self, seconds: i64) {
        self.clock.advance(Duration::seconds(seconds));
    }

    fn at(&self, tick: i64) -> DateTime<Utc> {
        self.start + Duration::seconds(tick)
    }

    fn events(&self) -> Vec<Event> {
        self.controller.event_log().query(&self.interview_id)
    }
}

fn empty() -> FrameObservation {
    FrameObservation::default()
}

fn faces(faces: Vec<FaceDetection>) -> FrameObservation {
    FrameObservation {
        faces,
        objects: Vec::new(),
    }
}

fn centered() -> FaceDetection {
    FaceDetection::centered_at(FRAME.center(), 60.0)
}

fn off_center() -> FaceDetection {
    FaceDetection::centered_at(Point::new(520.0, 240.0), 60.0)
}

#[test]
fn test_face_absent_for_eleven_ticks() {
    let mut harness = Harness::start("Alice");

    let mut emitted = Vec::new();
    for n in 1..=11 {
        for event in harness.tick(&empty()) {
            emitted.push((n, event));
        }
    }

    assert_eq!(emitted.len(), 1);
    let (tick, event) = &emitted[0];
    assert_eq!(*tick, 11);
    assert_eq!(event.kind, EventKind::FaceMissing);
    assert_eq!(event.message, "No face detected for more than 10 seconds");
    assert_eq!(event.timestamp, harness.at(11));
}

#[test]
fn test_look_away_reported_five_seconds_after_last_centered_tick() {
    let mut harness = Harness::start("Alice");

    let mut emitted = Vec::new();
    for _ in 1..=3 {
        emitted.extend(harness.tick(&faces(vec![centered()])));
    }
    for _ in 4..=9 {
        emitted.extend(harness.tick(&faces(vec![off_center()])));
    }

    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].kind, EventKind::LookingAway);
    assert_eq!(emitted[0].message, "User looking away for more than 5 seconds");
    assert_eq!(emitted[0].timestamp, harness.at(8));
}

#[test]
fn test_multiple_faces_reported_every_tick() {
    let mut harness = Harness::start("Alice");

    let mut emitted = Vec::new();
    for _ in 0..3 {
        emitted.extend(harness.tick(&faces(vec![centered(), centered()])));
    }

    let messages: Vec<&str> = emitted.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["Multiple faces detected (2)"; 3]);

    harness.controller.stop();
    let report = harness.controller.report().unwrap();
    assert_eq!(report.suspicious_count, 3);
    assert_eq!(report.integrity_score, 70);
}

#[test]
fn test_mixed_session_scores_eighty() {
    let mut harness = Harness::start("Alice");

    // Two absence reports at ticks 11 and 21.
    for _ in 1..=21 {
        harness.tick(&empty());
    }
    harness.tick(&FrameObservation {
        faces: vec![centered()],
        objects: vec![ObjectDetection::new("cell phone", 0.9)],
    });
    harness.controller.stop();

    let report = harness.controller.report().unwrap();
    assert_eq!(report.focus_lost_count, 2);
    assert_eq!(report.suspicious_count, 1);
    assert_eq!(report.deductions, 20);
    assert_eq!(report.integrity_score, 80);
    assert_eq!(report.duration_seconds, 22);

    let kinds: Vec<EventKind> = report.events.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::SessionStarted,
            EventKind::FaceMissing,
            EventKind::FaceMissing,
            EventKind::FaceReturned,
            EventKind::UnauthorizedItems,
            EventKind::SessionEnded,
        ]
    );
}

#[test]
fn test_events_query_in_timestamp_order() {
    let mut harness = Harness::start("Alice");
    for _ in 0..4 {
        harness.tick(&faces(vec![centered(), off_center()]));
    }
    harness.controller.stop();

    let events = harness.events();
    assert_eq!(events.first().map(|e| e.kind), Some(EventKind::SessionStarted));
    assert_eq!(events.last().map(|e| e.kind), Some(EventKind::SessionEnded));
    assert!(events
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp));
}

#[test]
fn test_live_listener_sees_every_event_once() {
    let mut harness = Harness::start("Alice");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    harness
        .controller
        .on_event(move |event| sink.lock().unwrap().push(event.display_line()));

    harness.tick(&faces(vec![centered(), centered()]));
    harness.controller.stop();
    harness.controller.stop();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].ends_with(" - Multiple faces detected (2)"));
    assert!(seen[1].ends_with(" - Interview ended"));
}

#[test]
fn test_start_message_names_candidate() {
    let harness = Harness::start("  Alice  ");
    let events = harness.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].message, "Interview started for candidate: Alice");
    assert_eq!(events[0].timestamp, harness.at(0));
}

#[test]
fn test_absence_after_face_reported_ten_seconds_after_last_face() {
    let mut harness = Harness::start("Alice");
    harness.tick(&faces(vec![centered()]));

    let mut emitted = Vec::new();
    for n in 2..=11 {
        for event in harness.tick(&empty()) {
            emitted.push((n, event));
        }
    }

    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].0, 11);
    assert_eq!(emitted[0].1.kind, EventKind::FaceMissing);
}

#[test]
fn test_brief_look_away_after_missed_ticks_is_silent() {
    let mut harness = Harness::start("Alice");
    harness.tick(&faces(vec![centered()]));
    harness.miss(30);

    assert!(harness.tick(&faces(vec![off_center()])).is_empty());
    assert!(harness.tick(&faces(vec![off_center()])).is_empty());
    let back = harness.tick(&faces(vec![centered()]));
    assert_eq!(back.len(), 1);
    assert_eq!(back[0].kind, EventKind::LookingBack);
    assert_eq!(harness.controller.report().unwrap().focus_lost_count, 0);
}

#[test]
fn test_brief_absence_after_missed_ticks_is_silent() {
    let mut harness = Harness::start("Alice");
    harness.tick(&faces(vec![centered()]));
    harness.miss(30);

    for _ in 0..3 {
        assert!(harness.tick(&empty()).is_empty());
    }
    let back = harness.tick(&faces(vec![centered()]));
    assert_eq!(back.len(), 1);
    assert_eq!(back[0].kind, EventKind::FaceReturned);
    assert_eq!(harness.controller.report().unwrap().focus_lost_count, 0);
}

