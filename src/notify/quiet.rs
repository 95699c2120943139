// Quiet-hours window

use crate::config::QuietHoursConfig;
use chrono::{Local, NaiveTime};

/// Daily window during which non-critical notifications are suppressed.
/// The window is half-open `[start, end)` and may wrap midnight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuietHours {
    window: Option<(NaiveTime, NaiveTime)>,
}

impl QuietHours {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            window: Some((start, end)),
        }
    }

    pub fn disabled() -> Self {
        Self { window: None }
    }

    pub fn from_config(config: &QuietHoursConfig) -> Self {
        if config.enabled && config.window().is_none() {
            tracing::warn!(
                "Invalid quiet hours '{}'-'{}', quiet hours disabled",
                config.start,
                config.end
            );
        }
        Self {
            window: config.window(),
        }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        match self.window {
            None => false,
            Some((start, end)) if start == end => false,
            Some((start, end)) if start < end => time >= start && time < end,
            Some((start, end)) => time >= start || time < end,
        }
    }

    pub fn is_active_now(&self) -> bool {
        self.contains(Local::now().time())
    }

    pub fn is_enabled(&self) -> bool {
        self.window.is_some()
    }
}
