// RAID / ZFS redundancy tracking

use crate::config::RaidConfig;
use crate::events::Severity;
use crate::host::format_duration;
use crate::watchdog::network::cooled_down;
use crate::watchdog::{Event, Findings};
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Default)]
pub struct RaidWatchdog {
    last_signature: String,
    down_since: Option<DateTime<Utc>>,
    alert_time: Option<DateTime<Utc>>,
    bypass_quiet: bool,
}

impl RaidWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Degradation alerts ignore quiet hours when `bypass` is set
    pub fn with_quiet_bypass(bypass: bool) -> Self {
        Self {
            bypass_quiet: bypass,
            ..Self::default()
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.down_since.is_some()
    }

    pub fn last_signature(&self) -> &str {
        &self.last_signature
    }

    pub fn check(
        &mut self,
        issues: &[String],
        cooldown: Duration,
        notify_recovery: bool,
        now: DateTime<Utc>,
    ) -> Findings {
        let mut findings = Findings::default();

        if issues.is_empty() {
            if let Some(since) = self.down_since.take() {
                self.last_signature.clear();
                self.alert_time = None;
                let message = format!(
                    "✅ RAID healthy again after {} degraded",
                    format_duration(now - since)
                );
                if notify_recovery {
                    findings.push(Event::notify(Severity::Info, message));
                } else {
                    findings.push(Event::log(Severity::Info, message));
                }
            }
            return findings;
        }

        let signature = issues.join("; ");
        let since = *self.down_since.get_or_insert(now);
        let changed = signature != self.last_signature;

        if changed || cooled_down(self.alert_time, cooldown, now) {
            self.alert_time = Some(now);
            let mut message = format!("💾 RAID problem detected:\n• {}", issues.join("\n• "));
            if !changed {
                message.push_str(&format!("\n(unresolved for {})", format_duration(now - since)));
            }
            findings.push(if self.bypass_quiet {
                Event::critical(message)
            } else {
                Event::notify(Severity::Critical, message)
            });
        }
        self.last_signature = signature;

        findings
    }

    pub fn check_with_config(&mut self, issues: &[String], config: &RaidConfig, now: DateTime<Utc>) -> Findings {
        self.check(issues, config.cooldown(), config.notify_recovery, now)
    }
}
