// Periodic summary and one-shot status rendering

use crate::events::EventCounts;
use crate::host::{format_bytes, format_duration, Stats, VolumeLabel};
use crate::watchdog::{ResourceTrends, StressSummary, TrendBuffer};
use chrono::{DateTime, Duration, Utc};

/// Everything that goes into one periodic report
pub struct Report<'a> {
    pub host: String,
    pub generated_at: DateTime<Utc>,
    pub period: Duration,
    pub stats: &'a Stats,
    pub trends: &'a ResourceTrends,
    pub stress: Vec<StressSummary>,
    pub predictions: Vec<(VolumeLabel, f64)>,
    pub counts: EventCounts,
}

impl Report<'_> {
    pub fn render(&self) -> String {
        let mut out = vec![format!(
            "📊 {} report, last {} ({})",
            self.host,
            format_duration(self.period),
            self.generated_at.format("%Y-%m-%d %H:%M UTC")
        )];

        if self.stats.is_populated() {
            out.push(String::new());
            out.push(trend_line("CPU", self.stats.cpu_percent, &self.trends.cpu));
            out.push(trend_line("RAM", self.stats.ram_percent, &self.trends.ram));
            out.extend(volume_lines(self.stats, &self.predictions));
        } else {
            out.push("No metrics collected yet".to_string());
        }

        out.push(String::new());
        if self.stress.is_empty() {
            out.push("No sustained stress this period".to_string());
        } else {
            out.push("Stress:".to_string());
            out.extend(self.stress.iter().map(|s| format!("• {}", s.render())));
        }

        let c = self.counts;
        out.push(String::new());
        out.push(format!(
            "Events: {} critical, {} action, {} warning, {} info",
            c.critical, c.action, c.warning, c.info
        ));

        out.join("\n")
    }
}

fn trend_line(label: &str, now: f64, trend: &TrendBuffer) -> String {
    match (trend.average(), trend.peak()) {
        (Some(avg), Some(peak)) => format!("{}: {:.1}% now, {:.1}% avg, {:.1}% peak", label, now, avg, peak),
        _ => format!("{}: {:.1}%", label, now),
    }
}

fn volume_lines(stats: &Stats, predictions: &[(VolumeLabel, f64)]) -> Vec<String> {
    stats
        .volumes
        .iter()
        .map(|v| {
            let mut line = format!(
                "{} ({}): {:.1}% used, {} free",
                v.label.label(),
                v.path,
                v.used_percent,
                format_bytes(v.free_bytes)
            );
            if let Some((_, days)) = predictions.iter().find(|(l, _)| *l == v.label) {
                line.push_str(&format!(", full in ~{:.1} days", days));
            }
            line
        })
        .collect()
}

/// Human-readable snapshot for the `status` command
pub fn render_status(stats: &Stats) -> String {
    let mut out = vec![
        format!("CPU:    {:.1}%", stats.cpu_percent),
        format!("RAM:    {:.1}%", stats.ram_percent),
        format!("Swap:   {:.1}%", stats.swap_percent),
        format!("I/O:    {:.1}%", stats.disk_io_percent),
        format!(
            "Load:   {:.2} {:.2} {:.2}",
            stats.load_avg.one, stats.load_avg.five, stats.load_avg.fifteen
        ),
        format!(
            "Uptime: {}",
            format_duration(Duration::seconds(stats.uptime.as_secs() as i64))
        ),
    ];
    out.extend(volume_lines(stats, &[]));

    if !stats.top_cpu.is_empty() {
        out.push("Top CPU:".to_string());
        out.extend(
            stats
                .top_cpu
                .iter()
                .map(|p| format!("  {:>7} {:<20} {:>6.1}%", p.pid, p.name, p.cpu_percent)),
        );
    }
    if !stats.top_ram.is_empty() {
        out.push("Top RAM:".to_string());
        out.extend(stats.top_ram.iter().map(|p| {
            format!(
                "  {:>7} {:<20} {:>10} ({:.1}%)",
                p.pid,
                p.name,
                format_bytes(p.memory_bytes),
                p.memory_percent
            )
        }));
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::VolumeUsage;
    use crate::watchdog::Resource;
    use chrono::TimeZone;

    fn stats() -> Stats {
        Stats {
            collected_at: Some(Utc::now()),
            cpu_percent: 40.0,
            ram_percent: 70.0,
            volumes: vec![VolumeUsage {
                label: VolumeLabel::Ssd,
                path: "/".to_string(),
                used_percent: 91.0,
                free_bytes: 10 * 1024 * 1024 * 1024,
                total_bytes: 100 * 1024 * 1024 * 1024,
            }],
            ..Stats::default()
        }
    }

    #[test]
    fn test_report_includes_trends_stress_and_counts() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let mut trends = ResourceTrends::new(10);
        let mut s = stats();
        trends.sample(&s, at);
        s.cpu_percent = 80.0;
        trends.sample(&s, at + Duration::minutes(5));

        let report = Report {
            host: "nas".to_string(),
            generated_at: at,
            period: Duration::hours(24),
            stats: &s,
            trends: &trends,
            stress: vec![StressSummary {
                resource: Resource::Ram,
                episodes: 2,
                total: Duration::minutes(40),
                longest: Duration::minutes(30),
            }],
            predictions: vec![(VolumeLabel::Ssd, 4.25)],
            counts: EventCounts {
                info: 3,
                warning: 1,
                action: 0,
                critical: 2,
            },
        }
        .render();

        assert!(report.starts_with("📊 nas report, last 1d 0h"));
        assert!(report.contains("CPU: 80.0% now, 60.0% avg, 80.0% peak"));
        assert!(report.contains("SSD (/): 91.0% used"));
        assert!(report.contains("full in ~4.2 days") || report.contains("full in ~4.3 days"));
        assert!(report.contains("• RAM: 2 episode(s)"));
        assert!(report.contains("Events: 2 critical, 0 action, 1 warning, 3 info"));
    }

    #[test]
    fn test_report_without_metrics() {
        let empty = Stats::default();
        let trends = ResourceTrends::new(1);
        let report = Report {
            host: "nas".to_string(),
            generated_at: Utc::now(),
            period: Duration::hours(1),
            stats: &empty,
            trends: &trends,
            stress: Vec::new(),
            predictions: Vec::new(),
            counts: EventCounts::default(),
        }
        .render();

        assert!(report.contains("No metrics collected yet"));
        assert!(report.contains("No sustained stress this period"));
    }

    #[test]
    fn test_status_lists_volumes() {
        let status = render_status(&stats());
        assert!(status.contains("CPU:    40.0%"));
        assert!(status.contains("SSD (/)"));
        assert!(!status.contains("Top CPU"));
    }
}
