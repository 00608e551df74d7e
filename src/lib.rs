//! Proctor Agent - camera-driven integrity monitoring for remote interviews.
//!
//! Turns noisy per-frame face and object detections into a small set of
//! debounced, human-readable integrity events, and folds the event log into
//! a bounded trust score.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Proctor Agent                           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌──────────────┐   ┌─────────────┐            │
//! │  │ Classifier  │──▶│ Focus/Object │──▶│  Event Log  │──▶ Scorer  │
//! │  │ (per tick)  │   │   Trackers   │   │(append-only)│            │
//! │  └─────────────┘   └──────────────┘   └─────────────┘            │
//! │         ▲                                    │                   │
//! │  ┌─────────────┐                      ┌─────────────┐            │
//! │  │  Session    │                      │    Sink     │            │
//! │  │ Controller  │                      │(best-effort)│            │
//! │  └─────────────┘                      └─────────────┘            │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use proctor_agent::{
//!     classifier::{FrameClassifier, Recording, ScriptedClassifier},
//!     clock::SystemClock,
//!     Config, Proctor, SessionController,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), proctor_agent::ProctorError> {
//! let config = Config::default();
//! let backend = Arc::new(ScriptedClassifier::new(Recording::default()));
//! let controller = SessionController::new(&config, Arc::new(SystemClock));
//! let mut proctor = Proctor::new(
//!     controller,
//!     FrameClassifier::from_backend(backend),
//!     config.tick_interval,
//! );
//!
//! proctor.on_event(|event| println!("{}", event.display_line()));
//! proctor.start_session("Alice").await?;
//! // ... interview ...
//! proctor.stop_session();
//! let report = proctor.generate_report()?;
//! println!("Integrity score: {}", report.integrity_score);
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod clock;
pub mod config;
pub mod core;
pub mod error;
pub mod session;
pub mod sink;
pub mod transparency;

#[cfg(feature = "gateway")]
pub mod gateway;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use classifier::{FrameClassifier, FrameObservation, Recording, ScriptedClassifier};
pub use config::{Config, ConfigError, TrackerConfig};
pub use self::core::{score, Event, EventKind, EventLog, IntegrityReport, InterviewId};
pub use error::{ClassifierError, GatewayError, ProctorError, ValidationError};
pub use session::{InterviewSummary, Proctor, Session, SessionController, SessionState};
pub use sink::{EventSink, NullSink, QueuedSink, SinkRecord};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

// Gateway re-exports (when enabled)
#[cfg(feature = "gateway")]
pub use gateway::{GatewayClient, GatewayConfig};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Notice shown to candidates before monitoring begins.
pub const MONITORING_NOTICE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║               PROCTOR AGENT - MONITORING NOTICE                  ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This interview is monitored through your camera.                ║
║                                                                  ║
║  ✓ WHAT WE RECORD:                                               ║
║    • Looking away from the screen for more than 5 seconds        ║
║    • Leaving the camera view for more than 10 seconds            ║
║    • More than one face in view                                  ║
║    • Phones, books, laptops or extra screens in view             ║
║                                                                  ║
║  ✗ WHAT WE NEVER RECORD:                                         ║
║    • Camera frames or video                                      ║
║    • Audio                                                       ║
║    • Anything outside the interview session                      ║
║                                                                  ║
║  Every recorded event is listed in the final report, together    ║
║  with the integrity score derived from it.                       ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitoring_notice_contents() {
        assert!(MONITORING_NOTICE.contains("MONITORING NOTICE"));
        assert!(MONITORING_NOTICE.contains("NEVER RECORD"));
        assert!(MONITORING_NOTICE.contains("more than 5 seconds"));
    }
}
