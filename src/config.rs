// Configuration management

use crate::error::{Result, WatchError};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub notifications: NotificationConfig,
    pub metrics: MetricsConfig,
    pub volumes: VolumesConfig,
    pub stress: StressConfig,
    pub kernel: KernelConfig,
    pub network: NetworkConfig,
    pub raid: RaidConfig,
    pub docker: DockerConfig,
    pub trends: TrendConfig,
    pub disk_prediction: DiskPredictionConfig,
    pub report: ReportConfig,
    pub event_log_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            notifications: NotificationConfig::default(),
            metrics: MetricsConfig::default(),
            volumes: VolumesConfig::default(),
            stress: StressConfig::default(),
            kernel: KernelConfig::default(),
            network: NetworkConfig::default(),
            raid: RaidConfig::default(),
            docker: DockerConfig::default(),
            trends: TrendConfig::default(),
            disk_prediction: DiskPredictionConfig::default(),
            report: ReportConfig::default(),
            event_log_capacity: 200,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub telegram: Option<TelegramConfig>,
    pub quiet_hours: QuietHoursConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuietHoursConfig {
    pub enabled: bool,
    /// Start of the window, "HH:MM" local time
    pub start: String,
    /// End of the window, "HH:MM" local time; may be earlier than start
    pub end: String,
}

impl Default for QuietHoursConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            start: "23:00".to_string(),
            end: "07:00".to_string(),
        }
    }
}

impl QuietHoursConfig {
    /// Parse the configured window. Unparseable times disable quiet hours.
    pub fn window(&self) -> Option<(NaiveTime, NaiveTime)> {
        if !self.enabled {
            return None;
        }
        let start = NaiveTime::parse_from_str(&self.start, "%H:%M").ok()?;
        let end = NaiveTime::parse_from_str(&self.end, "%H:%M").ok()?;
        Some((start, end))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub interval_secs: u64,
    pub top_processes: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            top_processes: 5,
        }
    }
}

impl MetricsConfig {
    pub fn interval(&self) -> Duration {
        secs_or(self.interval_secs, 5)
    }
}

/// Mount points treated as the SSD and HDD volumes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumesConfig {
    pub ssd_path: Option<String>,
    pub hdd_path: Option<String>,
}

impl Default for VolumesConfig {
    fn default() -> Self {
        Self {
            ssd_path: Some("/".to_string()),
            hdd_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Thresholds {
    pub warning: f64,
    pub critical: f64,
}

impl Thresholds {
    const fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }

    /// Warning threshold, clamped to a sane default when non-positive
    pub fn warning_or(&self, default: f64) -> f64 {
        if self.warning > 0.0 { self.warning } else { default }
    }

    /// Critical threshold, clamped to a sane default when non-positive
    pub fn critical_or(&self, default: f64) -> f64 {
        if self.critical > 0.0 { self.critical } else { default }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    pub enabled: bool,
    pub check_interval_secs: u64,
    pub min_duration_minutes: u64,
    pub critical_cooldown_minutes: u64,
    pub cpu: Thresholds,
    pub ram: Thresholds,
    pub swap: Thresholds,
    pub ssd: Thresholds,
    pub hdd: Thresholds,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_secs: 30,
            min_duration_minutes: 5,
            critical_cooldown_minutes: 30,
            cpu: Thresholds::new(85.0, 95.0),
            ram: Thresholds::new(85.0, 95.0),
            swap: Thresholds::new(50.0, 80.0),
            ssd: Thresholds::new(85.0, 95.0),
            hdd: Thresholds::new(90.0, 97.0),
        }
    }
}

impl StressConfig {
    pub fn interval(&self) -> Duration {
        secs_or(self.check_interval_secs, 30)
    }

    pub fn min_duration(&self) -> chrono::Duration {
        clamped_minutes(self.min_duration_minutes)
    }

    pub fn critical_cooldown(&self) -> chrono::Duration {
        minutes_or(self.critical_cooldown_minutes, 30)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    /// Lines of kernel log inspected per scan
    pub window_lines: usize,
    /// Force a reboot when the OOM killer loops
    pub oom_loop_reboot: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
            window_lines: 200,
            oom_loop_reboot: true,
        }
    }
}

impl KernelConfig {
    pub fn interval(&self) -> Duration {
        secs_or(self.interval_secs, 60)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub targets: Vec<String>,
    pub gateway: Option<String>,
    pub dns_host: String,
    pub timeout_secs: u64,
    pub failure_threshold: u32,
    pub cooldown_minutes: u64,
    pub notify_recovery: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
            targets: vec!["1.1.1.1".to_string(), "8.8.8.8".to_string()],
            gateway: None,
            dns_host: "google.com".to_string(),
            timeout_secs: 3,
            failure_threshold: 3,
            cooldown_minutes: 30,
            notify_recovery: true,
        }
    }
}

impl NetworkConfig {
    pub fn interval(&self) -> Duration {
        secs_or(self.interval_secs, 60)
    }

    pub fn timeout(&self) -> Duration {
        secs_or(self.timeout_secs, 3)
    }

    pub fn threshold(&self) -> u32 {
        if self.failure_threshold == 0 { 3 } else { self.failure_threshold }
    }

    pub fn cooldown(&self) -> chrono::Duration {
        minutes_or(self.cooldown_minutes, 30)
    }

    /// Ping targets; an empty list falls back to the defaults
    pub fn targets(&self) -> Vec<String> {
        let targets: Vec<String> = self
            .targets
            .iter()
            .filter(|t| !t.trim().is_empty())
            .cloned()
            .collect();
        if targets.is_empty() {
            Self::default().targets
        } else {
            targets
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RaidConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub cooldown_minutes: u64,
    pub notify_recovery: bool,
    /// Deliver degradation alerts during quiet hours
    pub bypass_quiet_hours: bool,
}

impl Default for RaidConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
            cooldown_minutes: 360,
            notify_recovery: true,
            bypass_quiet_hours: false,
        }
    }
}

impl RaidConfig {
    pub fn interval(&self) -> Duration {
        secs_or(self.interval_secs, 300)
    }

    pub fn cooldown(&self) -> chrono::Duration {
        minutes_or(self.cooldown_minutes, 360)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    pub watchdog: DockerWatchdogConfig,
    pub critical_containers: CriticalContainersConfig,
    pub auto_restart_on_ram_critical: AutoRestartConfig,
    pub disk_prune: DiskPruneConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerWatchdogConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub timeout_minutes: u64,
    pub auto_restart_service: bool,
    pub service_name: String,
}

impl Default for DockerWatchdogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
            timeout_minutes: 5,
            auto_restart_service: false,
            service_name: "docker.service".to_string(),
        }
    }
}

impl DockerWatchdogConfig {
    pub fn interval(&self) -> Duration {
        secs_or(self.interval_secs, 60)
    }

    pub fn timeout(&self) -> chrono::Duration {
        minutes_or(self.timeout_minutes, 5)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CriticalContainersConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub names: Vec<String>,
}

impl Default for CriticalContainersConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
            names: Vec::new(),
        }
    }
}

impl CriticalContainersConfig {
    pub fn interval(&self) -> Duration {
        secs_or(self.interval_secs, 60)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoRestartConfig {
    pub enabled: bool,
    pub ram_threshold: f64,
    pub max_restarts_per_hour: usize,
    pub restart_timeout_secs: u64,
}

impl Default for AutoRestartConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ram_threshold: 90.0,
            max_restarts_per_hour: 3,
            restart_timeout_secs: 60,
        }
    }
}

impl AutoRestartConfig {
    pub fn threshold(&self) -> f64 {
        if self.ram_threshold > 0.0 { self.ram_threshold } else { 90.0 }
    }

    pub fn max_per_hour(&self) -> usize {
        if self.max_restarts_per_hour == 0 { 3 } else { self.max_restarts_per_hour }
    }

    pub fn restart_timeout(&self) -> Duration {
        secs_or(self.restart_timeout_secs, 60)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskPruneConfig {
    pub enabled: bool,
    pub timeout_secs: u64,
}

impl Default for DiskPruneConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_secs: 300,
        }
    }
}

impl DiskPruneConfig {
    pub fn timeout(&self) -> Duration {
        secs_or(self.timeout_secs, 300)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub sample_interval_secs: u64,
    pub capacity: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: 300,
            capacity: 288,
        }
    }
}

impl TrendConfig {
    pub fn interval(&self) -> Duration {
        secs_or(self.sample_interval_secs, 300)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskPredictionConfig {
    pub enabled: bool,
    pub sample_interval_minutes: u64,
    pub warn_days: f64,
}

impl Default for DiskPredictionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_interval_minutes: 60,
            warn_days: 7.0,
        }
    }
}

impl DiskPredictionConfig {
    pub fn interval(&self) -> Duration {
        secs_or(self.sample_interval_minutes.saturating_mul(60), 3600)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub enabled: bool,
    pub interval_hours: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_hours: 24,
        }
    }
}

impl ReportConfig {
    pub fn interval(&self) -> Duration {
        secs_or(self.interval_hours.saturating_mul(3600), 24 * 3600)
    }
}

/// Upper bound for any configured period (ten years)
const MAX_PERIOD_SECS: u64 = 10 * 365 * 24 * 3600;

/// Zero intervals fall back to the default instead of spinning
fn secs_or(secs: u64, default: u64) -> Duration {
    Duration::from_secs(if secs == 0 { default } else { secs }.min(MAX_PERIOD_SECS))
}

fn minutes_or(minutes: u64, default: u64) -> chrono::Duration {
    clamped_minutes(if minutes == 0 { default } else { minutes })
}

fn clamped_minutes(minutes: u64) -> chrono::Duration {
    chrono::Duration::minutes(minutes.min(MAX_PERIOD_SECS / 60) as i64)
}

impl Config {
    /// Get default config path: ~/.config/hostwarden/config.yaml
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| WatchError::Config("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("hostwarden").join("config.yaml"))
    }

    /// Load config from path, falling back to defaults if not found
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = path.unwrap_or_else(|| Self::default_path().unwrap_or_default());

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_yaml::from_str(&contents).map_err(|e| {
                WatchError::Config(format!("{}: {}", config_path.display(), e))
            })?;
            tracing::info!("Loaded configuration from {}", config_path.display());
            Ok(config)
        } else {
            tracing::info!("No config at {}, using defaults", config_path.display());
            Ok(Self::default())
        }
    }

    /// Save config to path
    pub fn save(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
