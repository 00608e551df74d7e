//! Debounce timer for conditions that must persist before they are reported.

use chrono::{DateTime, Duration, Utc};

/// State of one tracked condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DwellState {
    /// Condition not present
    Clear,
    /// Condition present since `since`; reported once `threshold` elapses
    Armed { since: DateTime<Utc> },
}

/// What a single observation did to the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing to report
    Unchanged,
    /// Condition began on this observation
    Entered,
    /// Condition persisted past the threshold; the timer re-armed at `now`
    Elapsed,
    /// Condition ended after having been armed
    Cleared,
}

/// Hysteresis timer: `Clear -> Armed -> (Elapsed, re-arm)* -> Clear`.
///
/// Onset is backdated to the previous observation when it lies within
/// `max_gap` of the current one, since the condition may have started any
/// time after it. Nothing is reported on the onset observation itself. A
/// gap wider than `max_gap` between observations breaks continuity: the
/// condition is treated as first seen now.
#[derive(Debug, Clone)]
pub struct DwellTimer {
    threshold: Duration,
    max_gap: Duration,
    state: DwellState,
}

impl DwellTimer {
    pub fn new(threshold: Duration, max_gap: Duration) -> Self {
        Self {
            threshold,
            max_gap,
            state: DwellState::Clear,
        }
    }

    pub fn state(&self) -> DwellState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, DwellState::Armed { .. })
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Feed one observation of the condition.
    ///
    /// `previous` is the instant of the preceding observation, if any.
    pub fn observe(
        &mut self,
        present: bool,
        now: DateTime<Utc>,
        previous: Option<DateTime<Utc>>,
    ) -> Transition {
        let adjacent = previous.filter(|p| *p <= now && now - *p <= self.max_gap);

        match (self.state, present) {
            (DwellState::Clear, false) => Transition::Unchanged,
            (DwellState::Clear, true) => {
                self.state = DwellState::Armed {
                    since: adjacent.unwrap_or(now),
                };
                Transition::Entered
            }
            (DwellState::Armed { .. }, true) if adjacent.is_none() => {
                self.state = DwellState::Armed { since: now };
                Transition::Unchanged
            }
            (DwellState::Armed { since }, true) => {
                if now - since >= self.threshold {
                    self.state = DwellState::Armed { since: now };
                    Transition::Elapsed
                } else {
                    Transition::Unchanged
                }
            }
            (DwellState::Armed { .. }, false) => {
                self.state = DwellState::Clear;
                Transition::Cleared
            }
        }
    }

    /// Return to `Clear` without reporting.
    pub fn reset(&mut self) {
        self.state = DwellState::Clear;
    }
}
