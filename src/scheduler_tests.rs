#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::events::Severity;
    use crate::host::{
        ContainerInfo, ContainerUsage, KernelLogSource, MetricsSource, MockContainerRuntimeProbe,
        MockRemediationExecutor, NetworkProbe, RaidProbe, RemediationExecutor, Stats,
    };
    use crate::notify::{Notifier, QuietHours};
    use crate::remediation::Remediator;
    use crate::scheduler::{Probes, Scheduler};
    use crate::watchdog::{Event, Findings, Remediation};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::sync::oneshot;

    struct StaticMetrics;

    #[async_trait]
    impl MetricsSource for StaticMetrics {
        async fn collect(&self) -> Stats {
            Stats::default()
        }
    }

    /// Returns queued windows in order, then repeats the last one
    struct ScriptedKernel {
        windows: Mutex<VecDeque<Vec<String>>>,
        last: Mutex<Vec<String>>,
    }

    impl ScriptedKernel {
        fn new(windows: Vec<Vec<&str>>) -> Self {
            let windows = windows
                .into_iter()
                .map(|w| w.into_iter().map(String::from).collect())
                .collect();
            Self {
                windows: Mutex::new(windows),
                last: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl KernelLogSource for ScriptedKernel {
        async fn tail(&self) -> Vec<String> {
            let mut last = self.last.lock().unwrap();
            if let Some(next) = self.windows.lock().unwrap().pop_front() {
                *last = next;
            }
            last.clone()
        }
    }

    struct FixedNetwork {
        ping: bool,
        dns: bool,
    }

    #[async_trait]
    impl NetworkProbe for FixedNetwork {
        async fn ping(&self, _host: &str, _timeout: std::time::Duration) -> bool {
            self.ping
        }

        async fn resolve_dns(&self, _host: &str, _timeout: std::time::Duration) -> bool {
            self.dns
        }
    }

    struct FixedRaid(Vec<String>);

    #[async_trait]
    impl RaidProbe for FixedRaid {
        async fn status(&self) -> Vec<String> {
            self.0.clone()
        }
    }

    struct Harness {
        scheduler: Scheduler,
        rx: UnboundedReceiver<String>,
    }

    impl Harness {
        fn new(config: Config, containers: MockContainerRuntimeProbe, executor: MockRemediationExecutor) -> Self {
            Self::with_kernel(config, containers, executor, ScriptedKernel::new(Vec::new()))
        }

        fn with_kernel(
            config: Config,
            containers: MockContainerRuntimeProbe,
            executor: MockRemediationExecutor,
            kernel: ScriptedKernel,
        ) -> Self {
            let executor: Arc<dyn RemediationExecutor> = Arc::new(executor);
            let probes = Probes {
                metrics: Arc::new(StaticMetrics),
                containers: Arc::new(containers),
                kernel: Arc::new(kernel),
                network: Arc::new(FixedNetwork { ping: false, dns: false }),
                raid: Arc::new(FixedRaid(vec!["md0: degraded [U_]".to_string()])),
                executor: Arc::clone(&executor),
            };
            let (notifier, rx) = Notifier::new(QuietHours::disabled());
            let remediator = Remediator::new(None, executor);
            Self {
                scheduler: Scheduler::new(config, probes, notifier, remediator),
                rx,
            }
        }

        fn drain(&mut self) -> Vec<String> {
            let mut messages = Vec::new();
            while let Ok(message) = self.rx.try_recv() {
                messages.push(message);
            }
            messages
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn ram_stats(ram: f64) -> Stats {
        Stats {
            collected_at: Some(t0()),
            ram_percent: ram,
            ..Stats::default()
        }
    }

    fn auto_restart_config() -> Config {
        let mut config = Config::default();
        config.docker.auto_restart_on_ram_critical.enabled = true;
        config.docker.auto_restart_on_ram_critical.ram_threshold = 90.0;
        config
    }

    fn plex_usage() -> MockContainerRuntimeProbe {
        let mut containers = MockContainerRuntimeProbe::new();
        containers.expect_usage().returning(|| {
            Ok(vec![
                ContainerUsage { name: "plex".to_string(), running: true, memory_percent: 55.0 },
                ContainerUsage { name: "redis".to_string(), running: true, memory_percent: 4.0 },
            ])
        });
        containers
    }

    #[tokio::test]
    async fn test_ram_critical_restarts_heaviest_container() {
        let mut executor = MockRemediationExecutor::new();
        executor
            .expect_run()
            .withf(|command, args, _| {
                command == "docker" && args.len() == 2 && args[0] == "restart" && args[1] == "plex"
            })
            .times(1)
            .returning(|_, _, _| Ok("plex\n".to_string()));

        let mut h = Harness::new(auto_restart_config(), plex_usage(), executor);
        let ctx = h.scheduler.context();
        ctx.publish(ram_stats(96.0)).await;

        let handle = h.scheduler.check_ram_critical(t0()).await.expect("restart started");
        handle.await.unwrap();

        let messages = h.drain();
        assert_eq!(messages, vec!["✅ Auto-restart done: container 'plex' restarted"]);
        assert_eq!(ctx.restarts.lock().await.recent("plex"), 1);
        assert_eq!(ctx.events.counts().action, 2);
    }

    #[tokio::test]
    async fn test_ram_critical_respects_hourly_limit() {
        let mut executor = MockRemediationExecutor::new();
        executor.expect_run().times(0);

        let mut h = Harness::new(auto_restart_config(), plex_usage(), executor);
        let ctx = h.scheduler.context();
        ctx.publish(ram_stats(96.0)).await;
        {
            let mut restarts = ctx.restarts.lock().await;
            for i in 0..3 {
                restarts.record("plex", t0() - Duration::minutes(50 - i * 10));
            }
        }

        assert!(h.scheduler.check_ram_critical(t0()).await.is_none());
        assert!(h.drain().is_empty());
        assert_eq!(ctx.restarts.lock().await.recent("plex"), 3);
    }

    #[tokio::test]
    async fn test_ram_below_threshold_does_nothing() {
        let mut containers = MockContainerRuntimeProbe::new();
        containers.expect_usage().times(0);
        let mut executor = MockRemediationExecutor::new();
        executor.expect_run().times(0);

        let h = Harness::new(auto_restart_config(), containers, executor);
        h.scheduler.context().publish(ram_stats(80.0)).await;
        assert!(h.scheduler.check_ram_critical(t0()).await.is_none());
    }

    #[tokio::test]
    async fn test_failed_restart_is_still_counted_and_reported() {
        let mut executor = MockRemediationExecutor::new();
        executor
            .expect_run()
            .times(1)
            .returning(|_, _, _| Err(anyhow::anyhow!("container is paused")));

        let mut h = Harness::new(auto_restart_config(), plex_usage(), executor);
        let ctx = h.scheduler.context();
        ctx.publish(ram_stats(97.0)).await;

        h.scheduler.check_ram_critical(t0()).await.unwrap().await.unwrap();

        let messages = h.drain();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("❌ Failed to restart container plex"));
        assert_eq!(ctx.restarts.lock().await.recent("plex"), 1);
    }

    #[tokio::test]
    async fn test_kernel_oom_scenario_through_scheduler() {
        let oom = "Out of memory: Killed process 1234 (python3) total-vm:812345kB";
        let kernel = ScriptedKernel::new(vec![
            vec!["boot", oom],
            vec!["boot", oom],
            vec!["boot", oom, "Out of memory: Killed process 4321 (python3) total-vm:912345kB"],
        ]);
        let mut h = Harness::with_kernel(
            Config::default(),
            MockContainerRuntimeProbe::new(),
            MockRemediationExecutor::new(),
            kernel,
        );

        assert!(h.scheduler.check_kernel(t0()).await.is_empty());
        assert!(h.drain().is_empty());
        h.scheduler.check_kernel(t0() + Duration::minutes(1)).await;
        assert!(h.drain().is_empty());

        h.scheduler.check_kernel(t0() + Duration::minutes(2)).await;
        let messages = h.drain();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("OOM killer terminated process 'python3'"));
    }

    #[tokio::test]
    async fn test_docker_watchdog_restarts_service_via_systemctl() {
        let mut config = Config::default();
        config.docker.watchdog.auto_restart_service = true;

        let mut containers = MockContainerRuntimeProbe::new();
        containers.expect_list().returning(|| Ok(Vec::new()));
        let mut executor = MockRemediationExecutor::new();
        executor
            .expect_run()
            .withf(|command, args, _| command == "systemctl" && args.len() == 2 && args[1] == "docker.service")
            .times(1)
            .returning(|_, _, _| Ok(String::new()));

        let mut h = Harness::new(config, containers, executor);
        assert!(h.scheduler.check_docker(t0()).await.is_empty());

        let handles = h.scheduler.check_docker(t0() + Duration::minutes(6)).await;
        assert_eq!(handles.len(), 1);
        for handle in handles {
            handle.await.unwrap();
        }

        let messages = h.drain();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("🐳 No containers"));
        assert_eq!(messages[1], "✅ Service docker.service restarted");
    }

    #[tokio::test]
    async fn test_critical_containers_and_network_and_raid() {
        let mut config = Config::default();
        config.docker.critical_containers.names = vec!["db".to_string()];

        let mut containers = MockContainerRuntimeProbe::new();
        containers.expect_list().returning(|| {
            Ok(vec![ContainerInfo { name: "db".to_string(), running: false }])
        });
        let mut h = Harness::new(config, containers, MockRemediationExecutor::new());

        h.scheduler.check_critical_containers(t0()).await;
        for i in 0..3 {
            h.scheduler.check_network(t0() + Duration::minutes(i)).await;
        }
        h.scheduler.check_raid(t0()).await;

        let messages = h.drain();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].contains("'db' is not running"));
        assert!(messages[1].starts_with("🌐 Network down"));
        assert!(messages[2].contains("md0: degraded [U_]"));
    }

    #[tokio::test]
    async fn test_apply_routes_by_delivery() {
        let mut h = Harness::new(
            Config::default(),
            MockContainerRuntimeProbe::new(),
            MockRemediationExecutor::new(),
        );
        let ctx = h.scheduler.context();

        let findings = Findings {
            events: vec![
                Event::log(Severity::Info, "logged"),
                Event::notify(Severity::Warning, "notified"),
                Event::critical("critical"),
            ],
            actions: Vec::new(),
        };
        assert!(ctx.apply(findings).is_empty());

        assert_eq!(h.drain(), vec!["notified", "critical"]);
        assert_eq!(ctx.events.len(), 3);
    }

    #[tokio::test]
    async fn test_prune_remediation_reports_outcome() {
        let mut executor = MockRemediationExecutor::new();
        executor
            .expect_run()
            .times(1)
            .returning(|_, _, _| Ok("Total reclaimed space: 2GB".to_string()));
        let mut h = Harness::new(Config::default(), MockContainerRuntimeProbe::new(), executor);

        h.scheduler
            .context()
            .spawn_remediation(Remediation::PruneImages)
            .await
            .unwrap();
        assert_eq!(h.drain(), vec!["🧹 Docker image prune done: Total reclaimed space: 2GB"]);
    }

    #[tokio::test]
    async fn test_report_resets_period_counters() {
        let mut config = Config::default();
        config.stress.min_duration_minutes = 0;
        let mut h = Harness::new(config, MockContainerRuntimeProbe::new(), MockRemediationExecutor::new());
        let ctx = h.scheduler.context();

        let mut stats = ram_stats(99.0);
        ctx.publish(stats.clone()).await;
        h.scheduler.check_resources(t0()).await;
        stats.ram_percent = 10.0;
        ctx.publish(stats).await;
        h.scheduler.check_resources(t0() + Duration::minutes(10)).await;
        h.scheduler.sample_trends(t0() + Duration::minutes(10)).await;
        h.drain();

        let report = h.scheduler.send_report(t0() + Duration::hours(1)).await;
        assert!(report.contains("• RAM: 1 episode(s)"));
        assert_eq!(h.drain(), vec![report]);

        assert!(ctx.stress.lock().await.summaries().is_empty());
        assert!(ctx.events.is_empty());
    }

    // ---- scheduler loop ----

    #[derive(Default)]
    struct Counters {
        collects: AtomicUsize,
        kernel_scans: AtomicUsize,
        raid_scans: AtomicUsize,
    }

    struct CountingMetrics(Arc<Counters>);

    #[async_trait]
    impl MetricsSource for CountingMetrics {
        async fn collect(&self) -> Stats {
            self.0.collects.fetch_add(1, Ordering::SeqCst);
            Stats::default()
        }
    }

    struct CountingKernel(Arc<Counters>);

    #[async_trait]
    impl KernelLogSource for CountingKernel {
        async fn tail(&self) -> Vec<String> {
            self.0.kernel_scans.fetch_add(1, Ordering::SeqCst);
            Vec::new()
        }
    }

    struct CountingRaid(Arc<Counters>);

    #[async_trait]
    impl RaidProbe for CountingRaid {
        async fn status(&self) -> Vec<String> {
            self.0.raid_scans.fetch_add(1, Ordering::SeqCst);
            Vec::new()
        }
    }

    /// Only the kernel scan enabled, on its default 60s interval
    fn kernel_only_config() -> Config {
        let mut config = Config::default();
        config.stress.enabled = false;
        config.network.enabled = false;
        config.raid.enabled = false;
        config.docker.watchdog.enabled = false;
        config.docker.critical_containers.enabled = false;
        config.disk_prediction.enabled = false;
        config.report.enabled = false;
        config
    }

    fn counting_scheduler(config: Config, counters: &Arc<Counters>) -> Scheduler {
        let executor: Arc<dyn RemediationExecutor> = Arc::new(MockRemediationExecutor::new());
        let probes = Probes {
            metrics: Arc::new(CountingMetrics(Arc::clone(counters))),
            containers: Arc::new(MockContainerRuntimeProbe::new()),
            kernel: Arc::new(CountingKernel(Arc::clone(counters))),
            network: Arc::new(FixedNetwork { ping: true, dns: true }),
            raid: Arc::new(CountingRaid(Arc::clone(counters))),
            executor: Arc::clone(&executor),
        };
        let (notifier, _rx) = Notifier::new(QuietHours::disabled());
        Scheduler::new(config, probes, notifier, Remediator::new(None, executor))
    }

    #[tokio::test]
    async fn test_run_returns_on_shutdown() {
        let counters = Arc::new(Counters::default());
        let scheduler = counting_scheduler(kernel_only_config(), &counters);
        let (stop_tx, stop_rx) = oneshot::channel();

        let handle = tokio::spawn(scheduler.run(stop_rx));
        tokio::task::yield_now().await;
        stop_tx.send(()).unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_fires_enabled_domains_only() {
        let counters = Arc::new(Counters::default());
        let scheduler = counting_scheduler(kernel_only_config(), &counters);
        let (stop_tx, stop_rx) = oneshot::channel();

        let handle = tokio::spawn(scheduler.run(stop_rx));
        tokio::time::sleep(std::time::Duration::from_secs(130)).await;

        // Ticks at 0s, 60s and 120s
        assert_eq!(counters.kernel_scans.load(Ordering::SeqCst), 3);
        assert_eq!(counters.raid_scans.load(Ordering::SeqCst), 0);
        assert!(counters.collects.load(Ordering::SeqCst) > 0);

        stop_tx.send(()).unwrap();
        handle.await.unwrap();

        // Collector is aborted with the loop
        let collects = counters.collects.load(Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        assert_eq!(counters.collects.load(Ordering::SeqCst), collects);
        assert_eq!(counters.kernel_scans.load(Ordering::SeqCst), 3);
    }
}
