//! Session state machine.

use crate::classifier::types::{FrameObservation, FrameSize};
use crate::clock::Clock;
use crate::config::Config;
use crate::core::events::{Detected, Event, EventKind, EventLog, InterviewId};
use crate::core::focus::FocusTracker;
use crate::core::objects::ObjectTracker;
use crate::core::scoring::{self, IntegrityReport};
use crate::error::{ProctorError, ValidationError};
use crate::session::{next_interview_id, InterviewSummary, Session, SessionState};
use crate::sink::{EventSink, NullSink, SinkRecord};
use crate::transparency::{create_shared_log, SharedTransparencyLog};
use std::sync::Arc;

/// Owns the current session and everything scoped to it.
pub struct SessionController {
    clock: Arc<dyn Clock>,
    log: Arc<EventLog>,
    sink: Arc<dyn EventSink>,
    stats: SharedTransparencyLog,
    focus: FocusTracker,
    objects: ObjectTracker,
    state: SessionState,
}

impl SessionController {
    pub fn new(config: &Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            log: Arc::new(EventLog::new()),
            sink: Arc::new(NullSink),
            stats: create_shared_log(),
            focus: FocusTracker::new(config.tracker.clone(), config.tick_step()),
            objects: ObjectTracker::new(config.unauthorized_items.iter().cloned()),
            state: SessionState::Idle,
        }
    }

    /// Mirror every event to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_stats(mut self, stats: SharedTransparencyLog) -> Self {
        self.stats = stats;
        self
    }

    pub fn event_log(&self) -> Arc<EventLog> {
        self.log.clone()
    }

    pub fn stats(&self) -> SharedTransparencyLog {
        self.stats.clone()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Register a live-display callback, fired synchronously per event.
    ///
    /// Callbacks run while the controller is borrowed and must not call
    /// back into it.
    pub fn on_event(&self, listener: impl Fn(&Event) + Send + Sync + 'static) {
        self.log.on_event(listener);
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.state.session()
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Check whether a session could start for `candidate_name`.
    pub fn validate_start(&self, candidate_name: &str) -> Result<(), ValidationError> {
        if candidate_name.trim().is_empty() {
            return Err(ValidationError::MissingCandidateName);
        }
        if let SessionState::Active(session) = &self.state {
            return Err(ValidationError::SessionAlreadyActive(
                session.interview_id.to_string(),
            ));
        }
        Ok(())
    }

    /// `Idle|Ended -> Active`.
    pub fn start(&mut self, candidate_name: &str) -> Result<InterviewId, ProctorError> {
        self.validate_start(candidate_name)?;

        let candidate_name = candidate_name.trim().to_string();
        let now = self.clock.now();
        let interview_id = next_interview_id(now);

        self.log.clear();
        self.focus.reset();
        self.state = SessionState::Active(Session {
            interview_id: interview_id.clone(),
            candidate_name: candidate_name.clone(),
            start_time: now,
            end_time: None,
        });

        tracing::info!(interview_id = %interview_id, candidate = %candidate_name, "interview started");
        self.record(
            &interview_id,
            Detected::new(
                EventKind::SessionStarted,
                format!("Interview started for candidate: {candidate_name}"),
                now,
            ),
        );

        Ok(interview_id)
    }

    /// Feed one classified frame. Returns the events it produced.
    ///
    /// Observations for anything but the active session are discarded, which
    /// covers classifications still in flight when the session stopped.
    pub fn observe(
        &mut self,
        interview_id: &InterviewId,
        frame: FrameSize,
        observation: &FrameObservation,
    ) -> Vec<Event> {
        match &self.state {
            SessionState::Active(session) if &session.interview_id == interview_id => {}
            _ => {
                tracing::debug!(interview_id = %interview_id, "discarding observation outside active session");
                return Vec::new();
            }
        }

        let now = self.clock.now();
        let mut detected = self.focus.observe(&observation.faces, frame, now);
        detected.extend(self.objects.observe(&observation.objects, now));

        detected
            .into_iter()
            .map(|d| self.record(interview_id, d))
            .collect()
    }

    /// `Active -> Ended`. Returns false (and does nothing) when no session
    /// is active.
    pub fn stop(&mut self) -> bool {
        let SessionState::Active(session) = &self.state else {
            return false;
        };

        let now = self.clock.now();
        let mut session = session.clone();
        session.end_time = Some(now);
        let interview_id = session.interview_id.clone();
        self.state = SessionState::Ended(session);

        self.record(
            &interview_id,
            Detected::new(EventKind::SessionEnded, "Interview ended", now),
        );
        tracing::info!(interview_id = %interview_id, "interview ended");

        match self.summary() {
            Ok(summary) => self.sink.submit(SinkRecord::Interview(summary)),
            Err(e) => tracing::warn!(error = %e, "could not summarize interview"),
        }
        true
    }

    /// Score the current or most recent session.
    pub fn report(&self) -> Result<IntegrityReport, ProctorError> {
        let session = self.session().ok_or(ProctorError::NoSession)?;
        let events = self.log.query(&session.interview_id);
        Ok(scoring::score(
            &events,
            session.duration_seconds(self.clock.now()),
        ))
    }

    pub fn summary(&self) -> Result<InterviewSummary, ProctorError> {
        let session = self.session().ok_or(ProctorError::NoSession)?;
        let report = self.report()?;
        Ok(InterviewSummary::new(session, &report, self.clock.now()))
    }

    fn record(&self, interview_id: &InterviewId, detected: Detected) -> Event {
        let event = Event::new(interview_id.clone(), detected);
        self.log.append(event.clone());
        self.stats.record_event();
        self.sink.submit(SinkRecord::Event(event.to_record()));
        event
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state)
            .field("log", &self.log)
            .finish_non_exhaustive()
    }
}
