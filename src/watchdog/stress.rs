// Resource stress episodes

use crate::config::StressConfig;
use crate::events::Severity;
use crate::host::{format_duration, Stats, VolumeLabel};
use crate::watchdog::{Event, Findings};
use chrono::{DateTime, Duration, Utc};

/// Episodes shorter than this are left out of summaries (counters still see them)
pub const SUMMARY_FLOOR: Duration = Duration::minutes(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Cpu,
    Ram,
    Swap,
    Ssd,
    Hdd,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Cpu,
        Resource::Ram,
        Resource::Swap,
        Resource::Ssd,
        Resource::Hdd,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Resource::Cpu => "CPU",
            Resource::Ram => "RAM",
            Resource::Swap => "Swap",
            Resource::Ssd => "SSD",
            Resource::Hdd => "HDD",
        }
    }

    fn index(&self) -> usize {
        match self {
            Resource::Cpu => 0,
            Resource::Ram => 1,
            Resource::Swap => 2,
            Resource::Ssd => 3,
            Resource::Hdd => 4,
        }
    }

    /// Current value from a snapshot; `None` when the resource is not measured
    pub fn value(&self, stats: &Stats) -> Option<f64> {
        match self {
            Resource::Cpu => Some(stats.cpu_percent),
            Resource::Ram => Some(stats.ram_percent),
            Resource::Swap => Some(stats.swap_percent),
            Resource::Ssd => stats.volume(VolumeLabel::Ssd).map(|v| v.used_percent),
            Resource::Hdd => stats.volume(VolumeLabel::Hdd).map(|v| v.used_percent),
        }
    }

    pub fn thresholds(&self, config: &StressConfig) -> crate::config::Thresholds {
        match self {
            Resource::Cpu => config.cpu,
            Resource::Ram => config.ram,
            Resource::Swap => config.swap,
            Resource::Ssd => config.ssd,
            Resource::Hdd => config.hdd,
        }
    }
}

/// Result of one `evaluate` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StressTransition {
    pub started: bool,
    /// Length of the episode that just closed
    pub ended: Option<Duration>,
    pub sustained_notify: bool,
    pub recovered_notify: bool,
}

/// Tracks stress episodes of a single resource.
///
/// `current_start` is set iff the resource is at or above threshold, and
/// `notified` can only be true while an episode is open.
#[derive(Debug, Clone, Default)]
pub struct StressTracker {
    current_start: Option<DateTime<Utc>>,
    notified: bool,
    stress_count: u32,
    total_stress: Duration,
    longest_stress: Duration,
}

impl StressTracker {
    pub fn evaluate(
        &mut self,
        value: f64,
        threshold: f64,
        min_duration: Duration,
        now: DateTime<Utc>,
        quiet: bool,
    ) -> StressTransition {
        let mut transition = StressTransition::default();

        if value >= threshold {
            let start = match self.current_start {
                Some(start) => start,
                None => {
                    self.current_start = Some(now);
                    self.stress_count += 1;
                    self.notified = false;
                    transition.started = true;
                    now
                }
            };

            // Deferred during quiet hours: fires on the first quiet-free tick
            if !self.notified && !quiet && now - start >= min_duration {
                self.notified = true;
                transition.sustained_notify = true;
            }
        } else if let Some(start) = self.current_start.take() {
            let elapsed = (now - start).max(Duration::zero());
            self.total_stress = self.total_stress + elapsed;
            if elapsed > self.longest_stress {
                self.longest_stress = elapsed;
            }
            transition.ended = Some(elapsed);
            transition.recovered_notify = self.notified && !quiet;
            self.notified = false;
        }

        transition
    }

    pub fn is_stressed(&self) -> bool {
        self.current_start.is_some()
    }

    pub fn is_notified(&self) -> bool {
        self.notified
    }

    pub fn current_start(&self) -> Option<DateTime<Utc>> {
        self.current_start
    }

    pub fn stress_count(&self) -> u32 {
        self.stress_count
    }

    pub fn total_stress(&self) -> Duration {
        self.total_stress
    }

    pub fn longest_stress(&self) -> Duration {
        self.longest_stress
    }

    /// Zero the period counters; an open episode carries over
    pub fn reset_period(&mut self) {
        self.stress_count = 0;
        self.total_stress = Duration::zero();
        self.longest_stress = Duration::zero();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StressSummary {
    pub resource: Resource,
    pub episodes: u32,
    pub total: Duration,
    pub longest: Duration,
}

impl StressSummary {
    pub fn render(&self) -> String {
        format!(
            "{}: {} episode(s), total {}, longest {}",
            self.resource.label(),
            self.episodes,
            format_duration(self.total),
            format_duration(self.longest)
        )
    }
}

/// One tracker per monitored resource
#[derive(Debug, Clone, Default)]
pub struct StressMonitor {
    trackers: [StressTracker; 5],
}

impl StressMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracker(&self, resource: Resource) -> &StressTracker {
        &self.trackers[resource.index()]
    }

    /// Evaluate every measured resource of `stats` against its warning threshold
    pub fn check(&mut self, stats: &Stats, config: &StressConfig, now: DateTime<Utc>, quiet: bool) -> Findings {
        let mut findings = Findings::default();
        if !stats.is_populated() {
            return findings;
        }

        for resource in Resource::ALL {
            let Some(value) = resource.value(stats) else {
                continue;
            };
            let threshold = resource.thresholds(config).warning_or(default_warning(resource));
            findings.extend(self.evaluate(resource, value, threshold, config.min_duration(), now, quiet));
        }
        findings
    }

    pub fn evaluate(
        &mut self,
        resource: Resource,
        value: f64,
        threshold: f64,
        min_duration: Duration,
        now: DateTime<Utc>,
        quiet: bool,
    ) -> Findings {
        let tracker = &mut self.trackers[resource.index()];
        let started_at = tracker.current_start();
        let transition = tracker.evaluate(value, threshold, min_duration, now, quiet);
        let label = resource.label();
        let mut findings = Findings::default();

        if transition.started {
            findings.push(Event::log(
                Severity::Info,
                format!("{} stress began at {:.1}% (threshold {:.0}%)", label, value, threshold),
            ));
        }

        if transition.sustained_notify {
            let since = tracker.current_start().map(|s| now - s).unwrap_or_else(Duration::zero);
            findings.push(Event::notify(
                Severity::Warning,
                format!(
                    "⚠️ {} under stress: {:.1}% (threshold {:.0}%) for {}",
                    label,
                    value,
                    threshold,
                    format_duration(since)
                ),
            ));
        }

        if let Some(elapsed) = transition.ended {
            let message = format!(
                "{} back to {:.1}% after {} of stress",
                label,
                value,
                format_duration(elapsed)
            );
            if transition.recovered_notify {
                findings.push(Event::notify(Severity::Info, format!("✅ {}", message)));
            } else {
                tracing::debug!("{} episode since {:?} closed without notification", label, started_at);
                findings.push(Event::log(Severity::Info, message));
            }
        }

        findings
    }

    /// Resources whose longest episode this period clears the summary floor
    pub fn summaries(&self) -> Vec<StressSummary> {
        Resource::ALL
            .iter()
            .filter_map(|r| {
                let t = self.tracker(*r);
                (t.longest_stress() >= SUMMARY_FLOOR).then(|| StressSummary {
                    resource: *r,
                    episodes: t.stress_count(),
                    total: t.total_stress(),
                    longest: t.longest_stress(),
                })
            })
            .collect()
    }

    pub fn reset_period(&mut self) {
        for tracker in self.trackers.iter_mut() {
            tracker.reset_period();
        }
    }
}

fn default_warning(resource: Resource) -> f64 {
    match resource {
        Resource::Swap => 50.0,
        Resource::Hdd => 90.0,
        _ => 85.0,
    }
}
