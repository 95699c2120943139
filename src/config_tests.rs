#[cfg(test)]
mod tests {
    use crate::config::*;
    use crate::error::Result;
    use chrono::NaiveTime;
    use std::time::Duration;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.notifications.telegram.is_none());
        assert!(!config.notifications.quiet_hours.enabled);
        assert_eq!(config.stress.min_duration_minutes, 5);
        assert_eq!(config.stress.ram.warning, 85.0);
        assert_eq!(config.network.failure_threshold, 3);
        assert_eq!(config.raid.cooldown_minutes, 360);
        assert!(!config.raid.bypass_quiet_hours);
        assert!(!config.docker.auto_restart_on_ram_critical.enabled);
        assert_eq!(config.docker.auto_restart_on_ram_critical.max_restarts_per_hour, 3);
        assert_eq!(config.event_log_capacity, 200);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
notifications:
  telegram:
    bot_token: "123:abc"
    chat_id: "42"
  quiet_hours:
    enabled: true
    start: "22:30"
network:
  targets: ["9.9.9.9"]
docker:
  critical_containers:
    names: [db, web]
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.notifications.telegram.as_ref().unwrap().chat_id, "42");
        let (start, end) = config.notifications.quiet_hours.window().unwrap();
        assert_eq!(start, NaiveTime::from_hms_opt(22, 30, 0).unwrap());
        assert_eq!(end, NaiveTime::from_hms_opt(7, 0, 0).unwrap());
        assert_eq!(config.network.targets, vec!["9.9.9.9"]);
        assert_eq!(config.network.dns_host, "google.com");
        assert_eq!(config.docker.critical_containers.names, vec!["db", "web"]);
        assert!(config.docker.watchdog.enabled);
        assert_eq!(config.kernel.window_lines, 200);
    }

    #[test]
    fn test_invalid_quiet_hours_disable_window() {
        let quiet = QuietHoursConfig {
            enabled: true,
            start: "25:00".to_string(),
            end: "07:00".to_string(),
        };
        assert!(quiet.window().is_none());
        assert!(QuietHoursConfig::default().window().is_none());
    }

    #[test]
    fn test_zero_values_fall_back_to_defaults() {
        let mut config = Config::default();
        config.stress.check_interval_secs = 0;
        config.network.failure_threshold = 0;
        config.network.cooldown_minutes = 0;
        config.docker.auto_restart_on_ram_critical.ram_threshold = -5.0;
        config.docker.auto_restart_on_ram_critical.max_restarts_per_hour = 0;
        config.stress.cpu.critical = 0.0;

        assert_eq!(config.stress.interval(), Duration::from_secs(30));
        assert_eq!(config.network.threshold(), 3);
        assert_eq!(config.network.cooldown(), chrono::Duration::minutes(30));
        assert_eq!(config.docker.auto_restart_on_ram_critical.threshold(), 90.0);
        assert_eq!(config.docker.auto_restart_on_ram_critical.max_per_hour(), 3);
        assert_eq!(config.stress.cpu.critical_or(95.0), 95.0);
        assert_eq!(config.disk_prediction.interval(), Duration::from_secs(3600));
        assert_eq!(config.report.interval(), Duration::from_secs(24 * 3600));
    }

    #[test]
    fn test_oversized_periods_are_clamped() {
        let mut config = Config::default();
        config.disk_prediction.sample_interval_minutes = u64::MAX;
        config.report.interval_hours = u64::MAX;
        config.raid.cooldown_minutes = u64::MAX;
        config.stress.min_duration_minutes = u64::MAX;
        config.network.interval_secs = u64::MAX;

        let ten_years = Duration::from_secs(10 * 365 * 24 * 3600);
        assert_eq!(config.disk_prediction.interval(), ten_years);
        assert_eq!(config.report.interval(), ten_years);
        assert_eq!(config.network.interval(), ten_years);
        assert_eq!(config.raid.cooldown(), chrono::Duration::days(3650));
        assert_eq!(config.stress.min_duration(), chrono::Duration::days(3650));
    }

    #[test]
    fn test_empty_network_targets_fall_back() {
        let mut config = Config::default();
        config.network.targets = vec![];
        assert_eq!(config.network.targets(), vec!["1.1.1.1", "8.8.8.8"]);

        config.network.targets = vec![" ".to_string(), "9.9.9.9".to_string()];
        assert_eq!(config.network.targets(), vec!["9.9.9.9"]);
    }

    #[test]
    fn test_invalid_yaml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "stress: [not, a, map]").unwrap();

        let err = Config::load(Some(path)).unwrap_err();
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_config_default_path() {
        let path = Config::default_path();
        assert!(path.is_ok());

        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("hostwarden"));
        assert!(path.to_string_lossy().ends_with("config.yaml"));
    }

    #[test]
    fn test_config_load_missing() -> Result<()> {
        // Test loading non-existent config (should return defaults)
        let config = Config::load(Some("/nonexistent/config.yaml".into()))?;
        assert_eq!(config.network.interval_secs, 60);

        Ok(())
    }

    #[test]
    fn test_config_save_load() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config_path = dir.path().join("nested").join("config.yaml");

        let mut original = Config::default();
        original.kernel.oom_loop_reboot = false;
        original.docker.disk_prune.enabled = true;
        original.volumes.hdd_path = Some("/mnt/data".to_string());

        original.save(config_path.clone())?;
        let loaded = Config::load(Some(config_path))?;

        assert!(!loaded.kernel.oom_loop_reboot);
        assert!(loaded.docker.disk_prune.enabled);
        assert_eq!(loaded.volumes.hdd_path.as_deref(), Some("/mnt/data"));
        assert_eq!(loaded.stress.hdd.critical, 97.0);

        Ok(())
    }
}
