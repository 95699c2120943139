// Host metrics collection

use crate::config::{MetricsConfig, VolumesConfig};
use crate::host::{LoadAverage, MetricsSource, ProcessUsage, Stats, VolumeLabel, VolumeUsage};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use sysinfo::{Disks, ProcessesToUpdate, System};

/// Metrics source backed by `sysinfo` plus `/proc/diskstats`
pub struct SysinfoMetrics {
    system: Mutex<System>,
    disk_ticks: Mutex<Option<(Instant, HashMap<String, u64>)>>,
    volumes: Vec<(VolumeLabel, String)>,
    top_n: usize,
}

impl SysinfoMetrics {
    pub fn new(metrics: &MetricsConfig, volumes: &VolumesConfig) -> Self {
        let mut labelled = Vec::new();
        if let Some(path) = &volumes.ssd_path {
            labelled.push((VolumeLabel::Ssd, path.clone()));
        }
        if let Some(path) = &volumes.hdd_path {
            labelled.push((VolumeLabel::Hdd, path.clone()));
        }

        let mut system = System::new();
        // Prime CPU counters so the first real sample has a baseline
        system.refresh_cpu_usage();

        Self {
            system: Mutex::new(system),
            disk_ticks: Mutex::new(None),
            volumes: labelled,
            top_n: metrics.top_processes,
        }
    }

    fn collect_volumes(&self) -> Vec<VolumeUsage> {
        if self.volumes.is_empty() {
            return Vec::new();
        }

        let disks = Disks::new_with_refreshed_list();
        let mounts: Vec<(String, u64, u64)> = disks
            .list()
            .iter()
            .map(|d| {
                (
                    d.mount_point().to_string_lossy().into_owned(),
                    d.total_space(),
                    d.available_space(),
                )
            })
            .collect();

        self.volumes
            .iter()
            .filter_map(|(label, path)| {
                let (_, total, free) = best_mount(&mounts, path)?;
                Some(VolumeUsage {
                    label: *label,
                    path: path.clone(),
                    used_percent: percent(total.saturating_sub(*free), *total),
                    free_bytes: *free,
                    total_bytes: *total,
                })
            })
            .collect()
    }

    fn disk_io_percent(&self) -> f64 {
        let content = match std::fs::read_to_string("/proc/diskstats") {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("Failed to read /proc/diskstats: {}", e);
                return 0.0;
            }
        };

        let now = Instant::now();
        let current = parse_diskstats(&content);
        let mut previous = self.disk_ticks.lock().unwrap_or_else(|e| e.into_inner());
        let utilization = match previous.as_ref() {
            Some((then, before)) => io_utilization(before, &current, now.duration_since(*then)),
            None => 0.0,
        };
        *previous = Some((now, current));
        utilization
    }
}

#[async_trait]
impl MetricsSource for SysinfoMetrics {
    async fn collect(&self) -> Stats {
        let (cpu, ram, swap, top_cpu, top_ram) = {
            let mut sys = self.system.lock().unwrap_or_else(|e| e.into_inner());
            sys.refresh_cpu_usage();
            sys.refresh_memory();
            sys.refresh_processes(ProcessesToUpdate::All, true);

            let total = sys.total_memory();
            let mut processes: Vec<ProcessUsage> = sys
                .processes()
                .values()
                .map(|p| ProcessUsage {
                    pid: p.pid().as_u32(),
                    name: p.name().to_string_lossy().into_owned(),
                    cpu_percent: p.cpu_usage() as f64,
                    memory_bytes: p.memory(),
                    memory_percent: percent(p.memory(), total),
                })
                .collect();

            processes.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));
            let top_cpu: Vec<ProcessUsage> = processes.iter().take(self.top_n).cloned().collect();
            processes.sort_by(|a, b| b.memory_bytes.cmp(&a.memory_bytes));
            let top_ram: Vec<ProcessUsage> = processes.into_iter().take(self.top_n).collect();

            (
                sys.global_cpu_usage() as f64,
                percent(sys.used_memory(), total),
                percent(sys.used_swap(), sys.total_swap()),
                top_cpu,
                top_ram,
            )
        };

        let load = System::load_average();

        Stats {
            collected_at: Some(Utc::now()),
            cpu_percent: cpu,
            ram_percent: ram,
            swap_percent: swap,
            volumes: self.collect_volumes(),
            disk_io_percent: self.disk_io_percent(),
            load_avg: LoadAverage {
                one: load.one,
                five: load.five,
                fifteen: load.fifteen,
            },
            uptime: Duration::from_secs(System::uptime()),
            top_cpu,
            top_ram,
        }
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Pick the mount with the longest mount point that contains `path`
fn best_mount<'a>(mounts: &'a [(String, u64, u64)], path: &str) -> Option<&'a (String, u64, u64)> {
    let path = Path::new(path);
    mounts
        .iter()
        .filter(|(mount, _, _)| path.starts_with(mount))
        .max_by_key(|(mount, _, _)| mount.len())
}

/// Device name -> io_ticks (milliseconds spent doing I/O)
pub(crate) fn parse_diskstats(content: &str) -> HashMap<String, u64> {
    content
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 13 {
                return None;
            }
            let name = fields[2];
            if name.starts_with("loop") || name.starts_with("ram") {
                return None;
            }
            let ticks = fields[12].parse::<u64>().ok()?;
            Some((name.to_string(), ticks))
        })
        .collect()
}

/// Busiest device's share of wall time spent on I/O, in percent
pub(crate) fn io_utilization(
    before: &HashMap<String, u64>,
    after: &HashMap<String, u64>,
    elapsed: Duration,
) -> f64 {
    let elapsed_ms = elapsed.as_millis() as f64;
    if elapsed_ms <= 0.0 {
        return 0.0;
    }

    after
        .iter()
        .filter_map(|(dev, ticks)| {
            let prev = before.get(dev)?;
            Some(ticks.saturating_sub(*prev) as f64 / elapsed_ms * 100.0)
        })
        .fold(0.0, f64::max)
        .min(100.0)
}
