//! Per-signal watchdog state machines.
//!
//! Each watchdog owns its state and turns probe data into [`Findings`]:
//! events for the event log and notifier, plus remediation requests that
//! the scheduler executes in detached tasks. None of them perform I/O, so
//! every decision is driven by the `now` passed in.

pub mod autorestart;
pub mod containers;
pub mod critical;
pub mod docker;
pub mod kernel;
pub mod network;
pub mod raid;
pub mod stress;
pub mod trend;


pub use autorestart::{select_restart_candidate, RestartLimiter};
pub use containers::CriticalContainerMonitor;
pub use critical::CriticalResourceMonitor;
pub use docker::DockerWatchdog;
pub use kernel::{KernelEventKind, KernelWatchdog, OomLoopDetector};
pub use network::{NetworkCheck, NetworkWatchdog};
pub use raid::RaidWatchdog;
pub use stress::{Resource, StressMonitor, StressSummary, StressTracker, StressTransition};
pub use trend::{DiskHistory, ResourceTrends, TrendBuffer};

use crate::events::Severity;

/// How an event leaves the watchdog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Event log only
    LogOnly,
    /// Event log and notifier, subject to quiet hours
    Notify,
    /// Event log and notifier, bypassing quiet hours
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub severity: Severity,
    pub message: String,
    pub delivery: Delivery,
}

impl Event {
    pub fn log(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            delivery: Delivery::LogOnly,
        }
    }

    pub fn notify(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            delivery: Delivery::Notify,
        }
    }

    pub fn critical(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Critical,
            message: message.into(),
            delivery: Delivery::Critical,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.delivery != Delivery::LogOnly
    }
}

/// Autonomous action requested by a watchdog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Remediation {
    RestartService(String),
    RestartContainer(String),
    PruneImages,
    Reboot,
}

impl Remediation {
    pub fn describe(&self) -> String {
        match self {
            Remediation::RestartService(name) => format!("restart service {}", name),
            Remediation::RestartContainer(name) => format!("restart container {}", name),
            Remediation::PruneImages => "prune unused docker images".to_string(),
            Remediation::Reboot => "reboot host".to_string(),
        }
    }
}

/// Output of one watchdog tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Findings {
    pub events: Vec<Event>,
    pub actions: Vec<Remediation>,
}

impl Findings {
    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn act(&mut self, action: Remediation) {
        self.actions.push(action);
    }

    pub fn extend(&mut self, other: Findings) {
        self.events.extend(other.events);
        self.actions.extend(other.actions);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.actions.is_empty()
    }

    /// Events that reach the notifier
    pub fn notifications(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(|e| e.is_notification())
    }
}
