//! Transparency log of monitoring activity.
//!
//! Tracks what the monitor did during a session (frames sampled, events
//! logged, failures) so the candidate and the reviewer can audit it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monitoring counters for the current process.
#[derive(Debug)]
pub struct TransparencyLog {
    /// Sampling ticks that completed classification
    ticks_sampled: AtomicU64,
    /// Sampling ticks whose classification failed
    tick_failures: AtomicU64,
    /// Events appended to the event log
    events_logged: AtomicU64,
    /// Records the storage backend did not accept
    sink_failures: AtomicU64,
    /// When the log was created
    started_at: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl TransparencyLog {
    pub fn new() -> Self {
        Self {
            ticks_sampled: AtomicU64::new(0),
            tick_failures: AtomicU64::new(0),
            events_logged: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            started_at: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a transparency log with persistence.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::debug!(error = %e, "could not load previous transparency stats");
        }

        log
    }

    pub fn record_tick(&self) {
        self.ticks_sampled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tick_failure(&self) {
        self.tick_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event(&self) {
        self.events_logged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            ticks_sampled: self.ticks_sampled.load(Ordering::Relaxed),
            tick_failures: self.tick_failures.load(Ordering::Relaxed),
            events_logged: self.events_logged.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Monitoring Statistics:\n\
             - Frames sampled: {}\n\
             - Failed samples: {}\n\
             - Events logged: {}\n\
             - Events not delivered to backend: {}\n\
             - Uptime: {} seconds\n\
             \n\
             Monitoring Notice:\n\
             - Only detection results are kept, never camera frames\n\
             - Every logged event is visible to the candidate",
            stats.ticks_sampled,
            stats.tick_failures,
            stats.events_logged,
            stats.sink_failures,
            stats.uptime_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                ticks_sampled: stats.ticks_sampled,
                tick_failures: stats.tick_failures,
                events_logged: stats.events_logged,
                sink_failures: stats.sink_failures,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Load stats from disk.
    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.ticks_sampled
                    .store(persisted.ticks_sampled, Ordering::Relaxed);
                self.tick_failures
                    .store(persisted.tick_failures, Ordering::Relaxed);
                self.events_logged
                    .store(persisted.events_logged, Ordering::Relaxed);
                self.sink_failures
                    .store(persisted.sink_failures, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.ticks_sampled.store(0, Ordering::Relaxed);
        self.tick_failures.store(0, Ordering::Relaxed);
        self.events_logged.store(0, Ordering::Relaxed);
        self.sink_failures.store(0, Ordering::Relaxed);
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of transparency statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub ticks_sampled: u64,
    pub tick_failures: u64,
    pub events_logged: u64,
    pub sink_failures: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    ticks_sampled: u64,
    tick_failures: u64,
    events_logged: u64,
    sink_failures: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}

pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedTransparencyLog {
    Arc::new(TransparencyLog::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_and_reset() {
        let log = TransparencyLog::new();

        log.record_tick();
        log.record_tick();
        log.record_tick_failure();
        log.record_event();
        log.record_sink_failure();

        let stats = log.stats();
        assert_eq!(stats.ticks_sampled, 2);
        assert_eq!(stats.tick_failures, 1);
        assert_eq!(stats.events_logged, 1);
        assert_eq!(stats.sink_failures, 1);

        log.reset();
        assert_eq!(log.stats().ticks_sampled, 0);
    }

    #[test]
    fn test_persistence_roundtrip() {
        let path = std::env::temp_dir().join(format!(
            "proctor-transparency-{}.json",
            std::process::id()
        ));

        let log = TransparencyLog::with_persistence(path.clone());
        log.reset();
        log.record_event();
        log.record_event();
        log.save().unwrap();

        let reloaded = TransparencyLog::with_persistence(path.clone());
        assert_eq!(reloaded.stats().events_logged, 2);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_summary_format() {
        let summary = TransparencyLog::new().summary();
        assert!(summary.contains("Frames sampled"));
        assert!(summary.contains("Monitoring Notice"));
    }
}
