// Critical-threshold alerts per resource

use crate::config::StressConfig;
use crate::events::Severity;
use crate::host::{format_bytes, Stats, VolumeLabel};
use crate::watchdog::network::cooled_down;
use crate::watchdog::{Event, Findings, Remediation, Resource};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct CriticalResourceMonitor {
    last_alert: HashMap<Resource, DateTime<Utc>>,
}

impl CriticalResourceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(
        &mut self,
        stats: &Stats,
        config: &StressConfig,
        prune_on_disk_critical: bool,
        now: DateTime<Utc>,
    ) -> Findings {
        let mut findings = Findings::default();
        if !stats.is_populated() {
            return findings;
        }

        let cooldown: Duration = config.critical_cooldown();
        for resource in Resource::ALL {
            let Some(value) = resource.value(stats) else {
                continue;
            };
            let threshold = resource.thresholds(config).critical_or(95.0);
            if value < threshold {
                continue;
            }
            if !cooled_down(self.last_alert.get(&resource).copied(), cooldown, now) {
                continue;
            }
            self.last_alert.insert(resource, now);

            let mut message = format!(
                "🔥 {} critical: {:.1}% (limit {:.0}%)",
                resource.label(),
                value,
                threshold
            );
            let volume = match resource {
                Resource::Ssd => stats.volume(VolumeLabel::Ssd),
                Resource::Hdd => stats.volume(VolumeLabel::Hdd),
                _ => None,
            };
            if let Some(volume) = volume {
                message.push_str(&format!(
                    ", {} free on {}",
                    format_bytes(volume.free_bytes),
                    volume.path
                ));
            }
            if resource == Resource::Cpu || resource == Resource::Ram {
                if let Some(top) = top_offender(stats, resource) {
                    message.push_str(&format!("\nTop process: {}", top));
                }
            }

            findings.push(Event::notify(Severity::Critical, message));

            if volume.is_some() && prune_on_disk_critical && !findings.actions.contains(&Remediation::PruneImages) {
                findings.act(Remediation::PruneImages);
            }
        }

        findings
    }
}

fn top_offender(stats: &Stats, resource: Resource) -> Option<String> {
    match resource {
        Resource::Cpu => stats
            .top_cpu
            .first()
            .map(|p| format!("{} (pid {}) {:.1}% CPU", p.name, p.pid, p.cpu_percent)),
        Resource::Ram => stats
            .top_ram
            .first()
            .map(|p| format!("{} (pid {}) {}", p.name, p.pid, format_bytes(p.memory_bytes))),
        _ => None,
    }
}
