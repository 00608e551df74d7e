//! Fixed-interval sampling loop around a [`SessionController`].
//!
//! Ticks never overlap: each tick awaits its classification before the next
//! one is scheduled, and ticks missed meanwhile are skipped. Stopping cancels
//! the loop immediately; a classification still in flight completes on the
//! blocking pool but its result is discarded.

use crate::classifier::FrameClassifier;
use crate::core::events::{Event, InterviewId};
use crate::core::scoring::IntegrityReport;
use crate::error::{ClassifierError, ProctorError};
use crate::session::SessionController;
use crate::transparency::SharedTransparencyLog;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Session-facing API: start, stop, live events and reports.
pub struct Proctor {
    controller: Arc<Mutex<SessionController>>,
    classifier: FrameClassifier,
    tick_interval: Duration,
    sampler: Option<CancellationToken>,
}

impl Proctor {
    pub fn new(
        controller: SessionController,
        classifier: FrameClassifier,
        tick_interval: Duration,
    ) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
            classifier,
            tick_interval,
            sampler: None,
        }
    }

    /// Shared handle to the underlying controller.
    pub fn controller(&self) -> Arc<Mutex<SessionController>> {
        self.controller.clone()
    }

    fn lock(&self) -> MutexGuard<'_, SessionController> {
        self.controller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a live-display callback. See [`SessionController::on_event`].
    pub fn on_event(&self, listener: impl Fn(&Event) + Send + Sync + 'static) {
        self.lock().on_event(listener);
    }

    pub fn is_active(&self) -> bool {
        self.lock().is_active()
    }

    /// Validate, check the camera and models, then begin sampling.
    ///
    /// Must be called within a Tokio runtime. On any error the proctor stays
    /// idle.
    pub async fn start_session(&mut self, candidate_name: &str) -> Result<InterviewId, ProctorError> {
        self.lock().validate_start(candidate_name)?;

        let classifier = self.classifier.clone();
        tokio::task::spawn_blocking(move || classifier.ensure_ready())
            .await
            .map_err(|e| ProctorError::ClassifierUnavailable(ClassifierError::ModelNotLoaded(e.to_string())))?
            .map_err(|e| {
                tracing::error!(error = %e, "classifier unavailable");
                ProctorError::ClassifierUnavailable(e)
            })?;

        let (interview_id, stats) = {
            let mut controller = self.lock();
            (controller.start(candidate_name)?, controller.stats())
        };

        let cancel = CancellationToken::new();
        tokio::spawn(sampling_loop(
            self.controller.clone(),
            self.classifier.clone(),
            interview_id.clone(),
            self.tick_interval,
            stats,
            cancel.clone(),
        ));
        self.sampler = Some(cancel);

        Ok(interview_id)
    }

    /// Stop sampling and end the session. Safe to call repeatedly.
    pub fn stop_session(&mut self) {
        if let Some(cancel) = self.sampler.take() {
            cancel.cancel();
        }
        self.lock().stop();
    }

    pub fn generate_report(&self) -> Result<IntegrityReport, ProctorError> {
        self.lock().report()
    }
}

impl Drop for Proctor {
    fn drop(&mut self) {
        if let Some(cancel) = self.sampler.take() {
            cancel.cancel();
        }
    }
}

async fn sampling_loop(
    controller: Arc<Mutex<SessionController>>,
    classifier: FrameClassifier,
    interview_id: InterviewId,
    period: Duration,
    stats: SharedTransparencyLog,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(interview_id = %interview_id, "sampling loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                let classifier = classifier.clone();
                let classified = match tokio::task::spawn_blocking(move || classifier.classify()).await {
                    Ok(Ok(classified)) => classified,
                    Ok(Err(e)) => {
                        tracing::warn!(interview_id = %interview_id, error = %e, "frame classification failed");
                        stats.record_tick_failure();
                        continue;
                    }
                    Err(e) => {
                        tracing::error!(interview_id = %interview_id, error = %e, "classification worker panicked");
                        stats.record_tick_failure();
                        continue;
                    }
                };

                if cancel.is_cancelled() {
                    tracing::debug!(interview_id = %interview_id, "discarding classification finished after stop");
                    break;
                }

                stats.record_tick();
                controller
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .observe(&interview_id, classified.frame.size, &classified.observation);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{
        FaceClassifier, FaceDetection, Frame, FrameObservation, FrameSize, FrameSource,
        ObjectClassifier, ObjectDetection, Recording, ScriptedClassifier,
    };
    use crate::clock::SystemClock;
    use crate::config::Config;
    use crate::core::events::EventKind;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn proctor_for(backend: FrameClassifier) -> Proctor {
        let controller = SessionController::new(&Config::default(), Arc::new(SystemClock));
        Proctor::new(controller, backend, Duration::from_millis(10))
    }

    fn two_faces(frames: usize) -> Recording {
        let size = FrameSize::default();
        let frame = FrameObservation {
            faces: vec![
                FaceDetection::centered_at(size.center(), 50.0),
                FaceDetection::centered_at(size.center(), 30.0),
            ],
            objects: vec![ObjectDetection::new("cell phone", 0.8)],
        };
        Recording::new(size, vec![frame; frames])
    }

    /// Fails every other frame.
    struct Flaky(AtomicU64);

    impl FrameSource for Flaky {
        fn capture_frame(&self) -> Result<Frame, ClassifierError> {
            let index = self.0.fetch_add(1, Ordering::SeqCst);
            if index % 2 == 1 {
                return Err(ClassifierError::Camera("dropped frame".to_string()));
            }
            Ok(Frame {
                index,
                size: FrameSize::default(),
                captured_at: Utc::now(),
            })
        }
    }

    impl FaceClassifier for Flaky {
        fn estimate_faces(&self, _frame: &Frame) -> Result<Vec<FaceDetection>, ClassifierError> {
            let size = FrameSize::default();
            Ok(vec![
                FaceDetection::centered_at(size.center(), 50.0),
                FaceDetection::centered_at(size.center(), 30.0),
            ])
        }
    }

    impl ObjectClassifier for Flaky {
        fn detect(&self, _frame: &Frame) -> Result<Vec<ObjectDetection>, ClassifierError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_sampling_produces_events_until_stopped() {
        let backend = Arc::new(ScriptedClassifier::new(two_faces(1000)));
        let mut proctor = proctor_for(FrameClassifier::from_backend(backend.clone()));

        proctor.start_session("Alice").await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        proctor.stop_session();
        proctor.stop_session();

        let report = proctor.generate_report().unwrap();
        assert!(report.suspicious_count >= 2);

        let ended = report
            .events
            .iter()
            .filter(|e| e.kind == EventKind::SessionEnded)
            .count();
        assert_eq!(ended, 1);

        assert_eq!(report.events.last().map(|e| e.kind), Some(EventKind::SessionEnded));

        // No ticks land after the stop.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(
            proctor.generate_report().unwrap().events.len(),
            report.events.len()
        );
        assert!(backend.remaining() > 0);
    }

    #[tokio::test]
    async fn test_stopping_after_run_out_keeps_last_frame() {
        let backend = Arc::new(ScriptedClassifier::new(two_faces(5)));
        let mut proctor = proctor_for(FrameClassifier::from_backend(backend.clone()));

        proctor.start_session("Alice").await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while !backend.has_run_out() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        proctor.stop_session();

        // Multiple faces plus a phone on each of the five frames.
        assert_eq!(proctor.generate_report().unwrap().suspicious_count, 10);
    }

    #[tokio::test]
    async fn test_failed_ticks_do_not_stop_the_loop() {
        let backend = Arc::new(Flaky(AtomicU64::new(0)));
        let mut proctor = proctor_for(FrameClassifier::from_backend(backend));
        let stats = proctor.controller().lock().unwrap().stats();

        proctor.start_session("Alice").await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        proctor.stop_session();

        let snapshot = stats.stats();
        assert!(snapshot.tick_failures >= 2);
        assert!(snapshot.ticks_sampled >= 2);
        assert!(proctor.generate_report().unwrap().suspicious_count >= 2);
    }

    #[tokio::test]
    async fn test_unavailable_classifier_keeps_session_idle() {
        let backend = Arc::new(ScriptedClassifier::unavailable("no webcam"));
        let mut proctor = proctor_for(FrameClassifier::from_backend(backend));

        let err = proctor.start_session("Alice").await.unwrap_err();
        assert!(matches!(err, ProctorError::ClassifierUnavailable(_)));
        assert!(!proctor.is_active());
        assert!(matches!(
            proctor.generate_report(),
            Err(ProctorError::NoSession)
        ));
    }

    #[tokio::test]
    async fn test_validation_precedes_classifier_check() {
        let backend = Arc::new(ScriptedClassifier::unavailable("no webcam"));
        let mut proctor = proctor_for(FrameClassifier::from_backend(backend));

        let err = proctor.start_session("").await.unwrap_err();
        assert!(matches!(err, ProctorError::Validation(_)));
    }
}
