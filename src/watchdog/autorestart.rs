// Rate-limited container restarts on RAM pressure

use crate::host::ContainerUsage;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};

/// Containers below this memory share are never restart candidates
pub const CANDIDATE_FLOOR_PERCENT: f64 = 20.0;

/// Running container with the highest memory share above the floor
pub fn select_restart_candidate(usage: &[ContainerUsage]) -> Option<&ContainerUsage> {
    usage
        .iter()
        .filter(|c| c.running && c.memory_percent > CANDIDATE_FLOOR_PERCENT)
        .max_by(|a, b| a.memory_percent.total_cmp(&b.memory_percent))
}

/// Per-container restart history over a rolling window
#[derive(Debug, Clone)]
pub struct RestartLimiter {
    history: HashMap<String, VecDeque<DateTime<Utc>>>,
    max_per_window: usize,
    window: Duration,
}

impl RestartLimiter {
    pub fn new(max_per_hour: usize) -> Self {
        Self {
            history: HashMap::new(),
            max_per_window: max_per_hour.max(1),
            window: Duration::hours(1),
        }
    }

    pub fn set_max_per_hour(&mut self, max_per_hour: usize) {
        self.max_per_window = max_per_hour.max(1);
    }

    /// Whether another restart of `name` is allowed now
    pub fn allows(&mut self, name: &str, now: DateTime<Utc>) -> bool {
        let window = self.window;
        match self.history.get_mut(name) {
            Some(times) => {
                evict(times, window, now);
                times.len() < self.max_per_window
            }
            None => true,
        }
    }

    /// Record a permitted attempt, successful or not
    pub fn record(&mut self, name: &str, now: DateTime<Utc>) {
        self.history.entry(name.to_string()).or_default().push_back(now);
    }

    /// Check and record in one step; returns false when rate-limited
    pub fn try_acquire(&mut self, name: &str, now: DateTime<Utc>) -> bool {
        if !self.allows(name, now) {
            return false;
        }
        self.record(name, now);
        true
    }

    pub fn recent(&self, name: &str) -> usize {
        self.history.get(name).map_or(0, |t| t.len())
    }

    /// Drop expired timestamps and containers with no recent restarts
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let window = self.window;
        self.history.retain(|_, times| {
            evict(times, window, now);
            !times.is_empty()
        });
    }

    pub fn tracked(&self) -> usize {
        self.history.len()
    }
}

fn evict(times: &mut VecDeque<DateTime<Utc>>, window: Duration, now: DateTime<Utc>) {
    while let Some(oldest) = times.front() {
        if now - *oldest >= window {
            times.pop_front();
        } else {
            break;
        }
    }
}
