// Small in-memory trend buffers and disk fill prediction

use crate::events::Severity;
use crate::host::{Stats, VolumeLabel};
use crate::watchdog::network::cooled_down;
use crate::watchdog::{Event, Findings};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};

/// Fewer samples than this give no prediction
const MIN_PREDICTION_SAMPLES: usize = 6;
const PREDICTION_ALERT_COOLDOWN: Duration = Duration::hours(24);

/// Bounded ring of timestamped samples
#[derive(Debug, Clone)]
pub struct TrendBuffer {
    samples: VecDeque<(DateTime<Utc>, f64)>,
    capacity: usize,
}

impl TrendBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, at: DateTime<Utc>, value: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back((at, value));
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn average(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().map(|(_, v)| v).sum::<f64>() / self.samples.len() as f64)
    }

    pub fn peak(&self) -> Option<f64> {
        self.samples.iter().map(|(_, v)| *v).reduce(f64::max)
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().map(|(_, v)| *v)
    }

    /// Least-squares slope in units per day
    pub fn slope_per_day(&self) -> Option<f64> {
        let n = self.samples.len();
        if n < 2 {
            return None;
        }
        let origin = self.samples.front()?.0;
        let points: Vec<(f64, f64)> = self
            .samples
            .iter()
            .map(|(t, v)| ((*t - origin).num_seconds() as f64 / 86_400.0, *v))
            .collect();

        let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n as f64;
        let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n as f64;
        let (num, den) = points.iter().fold((0.0, 0.0), |(num, den), (x, y)| {
            (num + (x - mean_x) * (y - mean_y), den + (x - mean_x).powi(2))
        });

        if den == 0.0 {
            None
        } else {
            Some(num / den)
        }
    }
}

/// CPU and RAM history summarised in periodic reports
#[derive(Debug, Clone)]
pub struct ResourceTrends {
    pub cpu: TrendBuffer,
    pub ram: TrendBuffer,
}

impl ResourceTrends {
    pub fn new(capacity: usize) -> Self {
        Self {
            cpu: TrendBuffer::new(capacity),
            ram: TrendBuffer::new(capacity),
        }
    }

    pub fn sample(&mut self, stats: &Stats, now: DateTime<Utc>) {
        if !stats.is_populated() {
            return;
        }
        self.cpu.push(now, stats.cpu_percent);
        self.ram.push(now, stats.ram_percent);
    }
}

/// Per-volume usage history feeding the days-until-full estimate
#[derive(Debug, Clone)]
pub struct DiskHistory {
    volumes: HashMap<VolumeLabel, (String, TrendBuffer)>,
    last_alert: HashMap<VolumeLabel, DateTime<Utc>>,
    capacity: usize,
}

impl DiskHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            volumes: HashMap::new(),
            last_alert: HashMap::new(),
            capacity,
        }
    }

    pub fn sample(&mut self, stats: &Stats, now: DateTime<Utc>) {
        for volume in &stats.volumes {
            let capacity = self.capacity;
            let (path, buffer) = self
                .volumes
                .entry(volume.label)
                .or_insert_with(|| (volume.path.clone(), TrendBuffer::new(capacity)));
            path.clone_from(&volume.path);
            buffer.push(now, volume.used_percent);
        }
    }

    /// Estimated days until the volume reaches 100 %, if it is filling up
    pub fn days_until_full(&self, label: VolumeLabel) -> Option<f64> {
        let (_, buffer) = self.volumes.get(&label)?;
        if buffer.len() < MIN_PREDICTION_SAMPLES {
            return None;
        }
        let slope = buffer.slope_per_day()?;
        if slope <= 0.0 {
            return None;
        }
        let remaining = (100.0 - buffer.latest()?).max(0.0);
        Some(remaining / slope)
    }

    pub fn check(&mut self, warn_days: f64, now: DateTime<Utc>) -> Findings {
        let mut findings = Findings::default();
        let mut labels: Vec<VolumeLabel> = self.volumes.keys().copied().collect();
        labels.sort_by_key(|l| l.label());

        for label in labels {
            let Some(days) = self.days_until_full(label) else {
                continue;
            };
            if days >= warn_days {
                continue;
            }
            if !cooled_down(self.last_alert.get(&label).copied(), PREDICTION_ALERT_COOLDOWN, now) {
                continue;
            }
            self.last_alert.insert(label, now);

            let path = self.volumes.get(&label).map(|(p, _)| p.as_str()).unwrap_or("?");
            findings.push(Event::notify(
                Severity::Warning,
                format!(
                    "📈 {} ({}) predicted full in {:.1} days at the current rate",
                    label.label(),
                    path,
                    days
                ),
            ));
        }

        findings
    }
}
