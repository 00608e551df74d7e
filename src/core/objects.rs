//! Unauthorized item detection.

use crate::classifier::types::ObjectDetection;
use crate::core::events::{Detected, EventKind};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Object labels flagged unless configured otherwise.
pub const DEFAULT_UNAUTHORIZED_ITEMS: [&str; 5] = ["cell phone", "book", "laptop", "tv", "monitor"];

/// Flags unauthorized objects in the current frame.
///
/// Stateless across ticks: every frame containing a flagged item yields one
/// event, so a re-appearing item is never missed.
#[derive(Debug, Clone)]
pub struct ObjectTracker {
    unauthorized: BTreeSet<String>,
}

impl ObjectTracker {
    pub fn new<I, S>(unauthorized: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unauthorized: unauthorized.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_unauthorized(&self, label: &str) -> bool {
        self.unauthorized.contains(label)
    }

    pub fn observe(&self, objects: &[ObjectDetection], now: DateTime<Utc>) -> Option<Detected> {
        let matched: Vec<&str> = objects
            .iter()
            .filter(|o| self.is_unauthorized(&o.label))
            .map(|o| o.label.as_str())
            .collect();

        if matched.is_empty() {
            return None;
        }

        Some(Detected::new(
            EventKind::UnauthorizedItems,
            format!("Unauthorized items detected: {}", matched.join(", ")),
            now,
        ))
    }
}

impl Default for ObjectTracker {
    fn default() -> Self {
        Self::new(DEFAULT_UNAUTHORIZED_ITEMS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_all_matches_in_detection_order() {
        let tracker = ObjectTracker::default();
        let objects = vec![
            ObjectDetection::new("laptop", 0.7),
            ObjectDetection::new("person", 0.99),
            ObjectDetection::new("cell phone", 0.6),
        ];

        let event = tracker.observe(&objects, Utc::now()).unwrap();
        assert_eq!(event.kind, EventKind::UnauthorizedItems);
        assert_eq!(
            event.message,
            "Unauthorized items detected: laptop, cell phone"
        );
    }

    #[test]
    fn test_nothing_flagged() {
        let tracker = ObjectTracker::default();
        let objects = vec![ObjectDetection::new("person", 0.9), ObjectDetection::new("cup", 0.5)];
        assert!(tracker.observe(&objects, Utc::now()).is_none());
        assert!(tracker.observe(&[], Utc::now()).is_none());
    }

    #[test]
    fn test_custom_item_set() {
        let tracker = ObjectTracker::new(["headphones"]);
        assert!(tracker.is_unauthorized("headphones"));
        assert!(!tracker.is_unauthorized("book"));
    }
}
