//! Bounded history of recent failures, surfaced by the health endpoint.
//!
//! Owned by the application state and handed to handlers by reference.
//! Oldest entries are evicted once the capacity is reached.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One recorded failure.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub request_id: String,
    /// Where it happened: `resolve`, `debug`, `browser`, ...
    pub stage: String,
    pub url: Option<String>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Fixed-capacity ring buffer of [`ErrorRecord`]s.
#[derive(Debug)]
pub struct ErrorHistory {
    capacity: usize,
    entries: Mutex<VecDeque<ErrorRecord>>,
}

impl ErrorHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&self, request_id: &str, stage: &str, url: Option<&str>, message: impl Into<String>) {
        let entry = ErrorRecord {
            request_id: request_id.to_string(),
            stage: stage.to_string(),
            url: url.map(String::from),
            message: message.into(),
            timestamp: Utc::now(),
        };

        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Newest first.
    pub fn recent(&self) -> Vec<ErrorRecord> {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.iter().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_is_never_exceeded() {
        let history = ErrorHistory::new(3);
        for i in 0..10 {
            history.record("req", "resolve", None, format!("failure {i}"));
        }
        assert_eq!(history.len(), 3);
        let messages: Vec<String> = history.recent().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["failure 9", "failure 8", "failure 7"]);
    }

    #[test]
    fn test_zero_capacity_keeps_latest() {
        let history = ErrorHistory::new(0);
        history.record("a", "debug", Some("https://example.com"), "first");
        history.record("b", "debug", Some("https://example.com"), "second");
        let recent = history.recent();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].request_id, "b");
        assert_eq!(recent[0].url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_empty_history() {
        let history = ErrorHistory::new(5);
        assert!(history.is_empty());
        assert!(history.recent().is_empty());
    }
}
