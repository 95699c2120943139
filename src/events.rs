// Bounded in-memory log of recorded events, used for reports

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Action,
    Critical,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Action => "action",
            Severity::Critical => "critical",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Info => "ℹ️",
            Severity::Warning => "⚠️",
            Severity::Action => "🔧",
            Severity::Critical => "🚨",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventEntry {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
}

/// Per-severity totals since the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventCounts {
    pub info: usize,
    pub warning: usize,
    pub action: usize,
    pub critical: usize,
}

/// Ring buffer of recent events; the oldest entry is evicted when full
#[derive(Debug)]
pub struct EventLog {
    entries: Mutex<VecDeque<EventEntry>>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn add(&self, severity: Severity, message: impl Into<String>) {
        self.add_at(Utc::now(), severity, message);
    }

    pub fn add_at(&self, timestamp: DateTime<Utc>, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("event [{}] {}", severity.label(), message);

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(EventEntry {
            timestamp,
            severity,
            message,
        });
    }

    /// Most recent `n` events, newest last
    pub fn recent(&self, n: usize) -> Vec<EventEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn counts(&self) -> EventCounts {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().fold(EventCounts::default(), |mut acc, e| {
            match e.severity {
                Severity::Info => acc.info += 1,
                Severity::Warning => acc.warning += 1,
                Severity::Action => acc.action += 1,
                Severity::Critical => acc.critical += 1,
            }
            acc
        })
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
