//! Focus tracking from per-frame face detections.
//!
//! Turns the noisy face stream into "looking away", "no face" and
//! "multiple faces" events. Look-away and absence are debounced with
//! [`DwellTimer`]s; multiple faces are reported on every tick.

use crate::classifier::types::{FaceDetection, FrameSize};
use crate::config::TrackerConfig;
use crate::core::dwell::{DwellState, DwellTimer, Transition};
use crate::core::events::{Detected, EventKind};
use chrono::{DateTime, Duration, Utc};

/// Snapshot of the tracker's per-condition state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerState {
    pub is_looking_away: bool,
    pub looking_away_since: Option<DateTime<Utc>>,
    pub is_face_absent: bool,
    pub face_absent_since: Option<DateTime<Utc>>,
}

/// Stateful detector for one active session.
#[derive(Debug, Clone)]
pub struct FocusTracker {
    config: TrackerConfig,
    away: DwellTimer,
    absent: DwellTimer,
    last_tick: Option<DateTime<Utc>>,
}

impl FocusTracker {
    /// `tick` is the sampling period. Observations further apart than one
    /// and a half ticks are not treated as continuous.
    pub fn new(config: TrackerConfig, tick: Duration) -> Self {
        let max_gap = tick * 3 / 2;
        Self {
            away: DwellTimer::new(config.look_away_threshold(), max_gap),
            absent: DwellTimer::new(config.face_absence_threshold(), max_gap),
            config,
            last_tick: None,
        }
    }

    pub fn state(&self) -> TrackerState {
        let since = |state: DwellState| match state {
            DwellState::Armed { since } => Some(since),
            DwellState::Clear => None,
        };
        TrackerState {
            is_looking_away: self.away.is_armed(),
            looking_away_since: since(self.away.state()),
            is_face_absent: self.absent.is_armed(),
            face_absent_since: since(self.absent.state()),
        }
    }

    /// Forget all history, e.g. when a new session starts.
    pub fn reset(&mut self) {
        self.away.reset();
        self.absent.reset();
        self.last_tick = None;
    }

    /// Process all faces found in one frame.
    ///
    /// The first detection is taken as the candidate.
    pub fn observe(
        &mut self,
        faces: &[FaceDetection],
        frame: FrameSize,
        now: DateTime<Utc>,
    ) -> Vec<Detected> {
        let previous = self.last_tick.replace(now);
        let mut detected = Vec::new();

        let Some(subject) = faces.first() else {
            match self.absent.observe(true, now, previous) {
                // An absent face cannot also be looking away.
                Transition::Entered => self.away.reset(),
                Transition::Elapsed => detected.push(Detected::new(
                    EventKind::FaceMissing,
                    format!(
                        "No face detected for more than {} seconds",
                        self.absent.threshold().num_seconds()
                    ),
                    now,
                )),
                Transition::Unchanged | Transition::Cleared => {}
            }
            return detected;
        };

        if self.absent.observe(false, now, previous) == Transition::Cleared {
            detected.push(Detected::new(
                EventKind::FaceReturned,
                "Face detected again",
                now,
            ));
        }

        match self.away.observe(self.is_off_center(subject, frame), now, previous) {
            Transition::Elapsed => detected.push(Detected::new(
                EventKind::LookingAway,
                format!(
                    "User looking away for more than {} seconds",
                    self.away.threshold().num_seconds()
                ),
                now,
            )),
            Transition::Cleared => detected.push(Detected::new(
                EventKind::LookingBack,
                "User looking at screen again",
                now,
            )),
            Transition::Entered | Transition::Unchanged => {}
        }

        if faces.len() > 1 {
            detected.push(Detected::new(
                EventKind::MultipleFaces,
                format!("Multiple faces detected ({})", faces.len()),
                now,
            ));
        }

        detected
    }

    /// Off-center on either axis counts as away.
    fn is_off_center(&self, face: &FaceDetection, frame: FrameSize) -> bool {
        let point = face.reference_point();
        let center = frame.center();
        let threshold_x = frame.width * self.config.center_tolerance_x;
        let threshold_y = frame.height * self.config.center_tolerance_y;

        (point.x - center.x).abs() > threshold_x || (point.y - center.y).abs() > threshold_y
    }
}
