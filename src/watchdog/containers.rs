// Named critical container liveness (alert only)

use crate::events::Severity;
use crate::host::ContainerInfo;
use crate::watchdog::network::cooled_down;
use crate::watchdog::{Event, Findings};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

pub const CONTAINER_ALERT_COOLDOWN: Duration = Duration::minutes(10);

#[derive(Debug, Clone, Default)]
pub struct CriticalContainerMonitor {
    last_alert: HashMap<String, DateTime<Utc>>,
}

impl CriticalContainerMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, critical: &[String], containers: &[ContainerInfo], now: DateTime<Utc>) -> Findings {
        let mut findings = Findings::default();

        for name in critical {
            let problem = match containers.iter().find(|c| &c.name == name) {
                None => "not found",
                Some(c) if !c.running => "not running",
                Some(_) => continue,
            };

            if !cooled_down(self.last_alert.get(name).copied(), CONTAINER_ALERT_COOLDOWN, now) {
                continue;
            }
            self.last_alert.insert(name.clone(), now);

            tracing::warn!("Critical container {} is {}", name, problem);
            findings.push(Event::notify(
                Severity::Warning,
                format!("📦 Critical container '{}' is {}", name, problem),
            ));
        }

        findings
    }
}
