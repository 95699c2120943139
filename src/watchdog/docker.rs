// Container runtime liveness

use crate::config::DockerWatchdogConfig;
use crate::events::Severity;
use crate::host::format_duration;
use crate::watchdog::{Event, Findings, Remediation};
use chrono::{DateTime, Duration, Utc};

/// Detects a runtime that keeps reporting zero containers
#[derive(Debug, Clone, Default)]
pub struct DockerWatchdog {
    failure_start: Option<DateTime<Utc>>,
}

impl DockerWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failure_start(&self) -> Option<DateTime<Utc>> {
        self.failure_start
    }

    /// `container_count` is `None` when the runtime probe failed
    pub fn check(
        &mut self,
        container_count: Option<usize>,
        timeout: Duration,
        auto_restart: bool,
        service_name: &str,
        now: DateTime<Utc>,
    ) -> Findings {
        let mut findings = Findings::default();

        if matches!(container_count, Some(n) if n > 0) {
            if self.failure_start.take().is_some() {
                tracing::info!("Container runtime reports containers again");
            }
            return findings;
        }

        let start = *self.failure_start.get_or_insert(now);
        let elapsed = now - start;
        if elapsed <= timeout {
            return findings;
        }

        // Restart the clock so the next trigger needs another full timeout
        self.failure_start = None;

        if auto_restart {
            findings.push(Event::notify(
                Severity::Action,
                format!(
                    "🐳 No containers for {}. Restarting {}...",
                    format_duration(elapsed),
                    service_name
                ),
            ));
            findings.act(Remediation::RestartService(service_name.to_string()));
        } else {
            findings.push(Event::notify(
                Severity::Warning,
                format!(
                    "🐳 No containers reported for {}. Automatic restart of {} is disabled.",
                    format_duration(elapsed),
                    service_name
                ),
            ));
        }

        findings
    }

    pub fn check_with_config(
        &mut self,
        container_count: Option<usize>,
        config: &DockerWatchdogConfig,
        now: DateTime<Utc>,
    ) -> Findings {
        self.check(
            container_count,
            config.timeout(),
            config.auto_restart_service,
            &config.service_name,
            now,
        )
    }
}
