// Host data models shared by probes and watchdogs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Point-in-time host metrics. Replaced wholesale on every collection tick.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Stats {
    pub collected_at: Option<DateTime<Utc>>,
    pub cpu_percent: f64,
    pub ram_percent: f64,
    pub swap_percent: f64,
    pub volumes: Vec<VolumeUsage>,
    pub disk_io_percent: f64,
    pub load_avg: LoadAverage,
    #[serde(with = "serde_duration")]
    pub uptime: Duration,
    pub top_cpu: Vec<ProcessUsage>,
    pub top_ram: Vec<ProcessUsage>,
}

impl Stats {
    pub fn volume(&self, label: VolumeLabel) -> Option<&VolumeUsage> {
        self.volumes.iter().find(|v| v.label == label)
    }

    /// True once at least one collection has completed
    pub fn is_populated(&self) -> bool {
        self.collected_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolumeLabel {
    Ssd,
    Hdd,
}

impl VolumeLabel {
    pub fn label(&self) -> &'static str {
        match self {
            VolumeLabel::Ssd => "SSD",
            VolumeLabel::Hdd => "HDD",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VolumeUsage {
    pub label: VolumeLabel,
    pub path: String,
    pub used_percent: f64,
    pub free_bytes: u64,
    pub total_bytes: u64,
}

impl VolumeUsage {
    pub fn free_formatted(&self) -> String {
        format_bytes(self.free_bytes)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessUsage {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_bytes: u64,
    pub memory_percent: f64,
}

/// Container as reported by the runtime listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub name: String,
    pub running: bool,
}

/// Per-container memory usage as reported by the runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerUsage {
    pub name: String,
    pub running: bool,
    pub memory_percent: f64,
}

// Helper module for Duration serialization
mod serde_duration {
    use serde::{Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }
}

/// Format bytes as human-readable string (e.g., "45.2 GiB")
pub fn format_bytes(bytes: u64) -> String {
    use byte_unit::{Byte, UnitType};

    let byte = Byte::from_u64(bytes);
    format!("{:.1}", byte.get_appropriate_unit(UnitType::Binary))
}

/// Format an elapsed span as "2h 05m", "12m 30s" or "45s"
pub fn format_duration(span: chrono::Duration) -> String {
    let secs = span.num_seconds().max(0);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h >= 24 {
        format!("{}d {}h", h / 24, h % 24)
    } else if h > 0 {
        format!("{}h {:02}m", h, m)
    } else if m > 0 {
        format!("{}m {:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}
