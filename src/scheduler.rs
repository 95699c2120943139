//! Supervising loop that owns all watchdog state.
//!
//! One interval per domain feeds a single `tokio::select!`; a fired branch
//! runs to completion before the next one is polled, so checks never overlap.
//! Metrics are collected by a separate task and published as an
//! `Arc<Stats>` behind a read-mostly lock. Remediations run in detached tasks
//! that outlive the loop.

use crate::config::Config;
use crate::events::{EventLog, Severity};
use crate::host::{
    ContainerRuntimeProbe, DockerCli, KernelJournal, KernelLogSource, MdstatProbe, MetricsSource,
    NetworkProbe, RaidProbe, RemediationExecutor, Stats, SysinfoMetrics, SystemExecutor,
    SystemNetworkProbe,
};
use crate::notify::Notifier;
use crate::remediation::{Remediator, REBOOT_TIMEOUT, SERVICE_RESTART_TIMEOUT};
use crate::report::Report;
use crate::watchdog::{
    select_restart_candidate, CriticalContainerMonitor, CriticalResourceMonitor, Delivery,
    DiskHistory, DockerWatchdog, Findings, KernelWatchdog, NetworkCheck, NetworkWatchdog,
    RaidWatchdog, Remediation, ResourceTrends, RestartLimiter, StressMonitor,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Latest metrics snapshot, replaced wholesale by the collector
pub type SharedStats = Arc<RwLock<Arc<Stats>>>;

const RESTART_PRUNE_INTERVAL: Duration = Duration::from_secs(3600);

/// Leaf producers consumed by the watchdogs
#[derive(Clone)]
pub struct Probes {
    pub metrics: Arc<dyn MetricsSource>,
    pub containers: Arc<dyn ContainerRuntimeProbe>,
    pub kernel: Arc<dyn KernelLogSource>,
    pub network: Arc<dyn NetworkProbe>,
    pub raid: Arc<dyn RaidProbe>,
    pub executor: Arc<dyn RemediationExecutor>,
}

impl Probes {
    /// Real host implementations
    pub fn system(config: &Config) -> Self {
        let executor: Arc<dyn RemediationExecutor> = Arc::new(SystemExecutor);
        Self {
            metrics: Arc::new(SysinfoMetrics::new(&config.metrics, &config.volumes)),
            containers: Arc::new(DockerCli::new(Arc::clone(&executor))),
            kernel: Arc::new(KernelJournal::new(config.kernel.window_lines)),
            network: Arc::new(SystemNetworkProbe),
            raid: Arc::new(MdstatProbe::new(Some(Arc::clone(&executor)))),
            executor,
        }
    }
}

/// All state owned by the scheduler, one lock per group
pub struct Context {
    pub config: Config,
    pub stats: SharedStats,
    pub notifier: Notifier,
    pub events: Arc<EventLog>,
    remediator: Remediator,
    pub stress: Mutex<StressMonitor>,
    pub critical: Mutex<CriticalResourceMonitor>,
    pub kernel: Mutex<KernelWatchdog>,
    pub network: Mutex<NetworkWatchdog>,
    pub raid: Mutex<RaidWatchdog>,
    pub docker: Mutex<DockerWatchdog>,
    pub containers: Mutex<CriticalContainerMonitor>,
    pub restarts: Mutex<RestartLimiter>,
    pub trends: Mutex<ResourceTrends>,
    pub disks: Mutex<DiskHistory>,
    report_started: Mutex<DateTime<Utc>>,
}

impl Context {
    pub fn new(config: Config, notifier: Notifier, remediator: Remediator) -> Self {
        Self {
            stats: Arc::new(RwLock::new(Arc::new(Stats::default()))),
            notifier,
            events: Arc::new(EventLog::new(config.event_log_capacity)),
            remediator,
            stress: Mutex::new(StressMonitor::new()),
            critical: Mutex::new(CriticalResourceMonitor::new()),
            kernel: Mutex::new(KernelWatchdog::new(config.kernel.oom_loop_reboot)),
            network: Mutex::new(NetworkWatchdog::new()),
            raid: Mutex::new(RaidWatchdog::with_quiet_bypass(config.raid.bypass_quiet_hours)),
            docker: Mutex::new(DockerWatchdog::new()),
            containers: Mutex::new(CriticalContainerMonitor::new()),
            restarts: Mutex::new(RestartLimiter::new(
                config.docker.auto_restart_on_ram_critical.max_per_hour(),
            )),
            trends: Mutex::new(ResourceTrends::new(config.trends.capacity)),
            disks: Mutex::new(DiskHistory::new(disk_history_capacity(&config))),
            report_started: Mutex::new(Utc::now()),
            config,
        }
    }

    pub async fn snapshot(&self) -> Arc<Stats> {
        Arc::clone(&*self.stats.read().await)
    }

    pub async fn publish(&self, stats: Stats) {
        *self.stats.write().await = Arc::new(stats);
    }

    /// Record events, dispatch notifications and start requested remediations
    pub fn apply(&self, findings: Findings) -> Vec<JoinHandle<()>> {
        for event in &findings.events {
            self.events.add(event.severity, event.message.clone());
            match event.delivery {
                Delivery::LogOnly => {}
                Delivery::Notify => {
                    self.notifier.send(&event.message, false);
                }
                Delivery::Critical => {
                    self.notifier.send(&event.message, true);
                }
            }
        }

        findings
            .actions
            .into_iter()
            .map(|action| self.spawn_remediation(action))
            .collect()
    }

    fn remediation_timeout(&self, action: &Remediation) -> Duration {
        match action {
            Remediation::RestartService(_) => SERVICE_RESTART_TIMEOUT,
            Remediation::RestartContainer(_) => self.config.docker.auto_restart_on_ram_critical.restart_timeout(),
            Remediation::PruneImages => self.config.docker.disk_prune.timeout(),
            Remediation::Reboot => REBOOT_TIMEOUT,
        }
    }

    /// Run `action` detached; its outcome is posted to the event log and notifier
    pub fn spawn_remediation(&self, action: Remediation) -> JoinHandle<()> {
        let remediator = self.remediator.clone();
        let notifier = self.notifier.clone();
        let events = Arc::clone(&self.events);
        let timeout = self.remediation_timeout(&action);

        tokio::spawn(async move {
            tracing::info!("Remediation started: {}", action.describe());
            match remediator.execute(&action, timeout).await {
                Ok(output) => {
                    let message = match &action {
                        Remediation::RestartService(name) => format!("✅ Service {} {}", name, output),
                        Remediation::RestartContainer(name) => {
                            format!("✅ Auto-restart done: container '{}' restarted", name)
                        }
                        Remediation::PruneImages => format!("🧹 Docker image prune done: {}", output),
                        Remediation::Reboot => {
                            events.add(Severity::Action, "Reboot issued");
                            return;
                        }
                    };
                    tracing::info!("{}", message);
                    events.add(Severity::Action, message.clone());
                    notifier.send(&message, false);
                }
                Err(e) => {
                    let message = format!("❌ Failed to {}: {}", action.describe(), e);
                    tracing::error!("{}", message);
                    events.add(Severity::Critical, message.clone());
                    notifier.send(&message, action == Remediation::Reboot);
                }
            }
        })
    }
}

fn disk_history_capacity(config: &Config) -> usize {
    // Two weeks of samples at the configured cadence
    let per_day = (86_400 / config.disk_prediction.interval().as_secs().max(1)) as usize;
    (per_day * 14).max(24)
}

pub struct Scheduler {
    ctx: Arc<Context>,
    probes: Probes,
}

impl Scheduler {
    pub fn new(config: Config, probes: Probes, notifier: Notifier, remediator: Remediator) -> Self {
        Self {
            ctx: Arc::new(Context::new(config, notifier, remediator)),
            probes,
        }
    }

    pub fn context(&self) -> Arc<Context> {
        Arc::clone(&self.ctx)
    }

    /// Collect one snapshot and publish it
    pub async fn collect_now(&self) -> Arc<Stats> {
        let mut stats = self.probes.metrics.collect().await;
        stats.collected_at.get_or_insert_with(Utc::now);
        self.ctx.publish(stats).await;
        self.ctx.snapshot().await
    }

    /// Metrics collector task; runs until aborted
    pub fn spawn_collector(&self) -> JoinHandle<()> {
        let metrics = Arc::clone(&self.probes.metrics);
        let ctx = Arc::clone(&self.ctx);
        let period = ctx.config.metrics.interval();

        tokio::spawn(async move {
            let mut tick = ticker(period);
            loop {
                tick.tick().await;
                let mut stats = metrics.collect().await;
                stats.collected_at.get_or_insert_with(Utc::now);
                ctx.publish(stats).await;
            }
        })
    }

    /// Stress episodes, critical thresholds and RAM-critical auto-restart
    pub async fn check_resources(&self, now: DateTime<Utc>) {
        let config = &self.ctx.config;
        let stats = self.ctx.snapshot().await;

        if config.stress.enabled {
            let quiet = self.ctx.notifier.in_quiet_hours();
            let findings = self.ctx.stress.lock().await.check(&stats, &config.stress, now, quiet);
            self.ctx.apply(findings);

            let findings = self.ctx.critical.lock().await.check(
                &stats,
                &config.stress,
                config.docker.disk_prune.enabled,
                now,
            );
            self.ctx.apply(findings);
        }

        if config.docker.auto_restart_on_ram_critical.enabled {
            self.check_ram_critical(now).await;
        }
    }

    /// Restart the heaviest container when RAM is critical. Returns the restart task, if one was started.
    pub async fn check_ram_critical(&self, now: DateTime<Utc>) -> Option<JoinHandle<()>> {
        let policy = &self.ctx.config.docker.auto_restart_on_ram_critical;
        let stats = self.ctx.snapshot().await;
        if !stats.is_populated() || stats.ram_percent < policy.threshold() {
            return None;
        }

        let usage = match self.probes.containers.usage().await {
            Ok(usage) => usage,
            Err(e) => {
                tracing::warn!("Container usage unavailable during RAM-critical check: {}", e);
                return None;
            }
        };
        let Some(candidate) = select_restart_candidate(&usage) else {
            tracing::debug!("RAM at {:.1}% but no container qualifies for restart", stats.ram_percent);
            return None;
        };

        {
            let mut restarts = self.ctx.restarts.lock().await;
            restarts.set_max_per_hour(policy.max_per_hour());
            if !restarts.try_acquire(&candidate.name, now) {
                tracing::warn!(
                    "Auto-restart of {} skipped: {} restarts in the last hour",
                    candidate.name,
                    restarts.recent(&candidate.name)
                );
                return None;
            }
        }

        self.ctx.events.add(
            Severity::Action,
            format!(
                "RAM at {:.1}%, restarting container {} ({:.1}% memory)",
                stats.ram_percent, candidate.name, candidate.memory_percent
            ),
        );
        Some(self.ctx.spawn_remediation(Remediation::RestartContainer(candidate.name.clone())))
    }

    pub async fn check_kernel(&self, now: DateTime<Utc>) -> Vec<JoinHandle<()>> {
        let lines = self.probes.kernel.tail().await;
        let findings = self.ctx.kernel.lock().await.scan(&lines, now);
        self.ctx.apply(findings)
    }

    pub async fn check_network(&self, now: DateTime<Utc>) {
        let config = &self.ctx.config.network;
        let result = NetworkCheck::probe(self.probes.network.as_ref(), config).await;
        let findings = self.ctx.network.lock().await.check_with_config(result, config, now);
        self.ctx.apply(findings);
    }

    pub async fn check_raid(&self, now: DateTime<Utc>) {
        let issues = self.probes.raid.status().await;
        let findings = self.ctx.raid.lock().await.check_with_config(&issues, &self.ctx.config.raid, now);
        self.ctx.apply(findings);
    }

    pub async fn check_docker(&self, now: DateTime<Utc>) -> Vec<JoinHandle<()>> {
        let count = match self.probes.containers.list().await {
            Ok(containers) => Some(containers.len()),
            Err(e) => {
                tracing::warn!("Container listing failed: {}", e);
                None
            }
        };
        let findings = self
            .ctx
            .docker
            .lock()
            .await
            .check_with_config(count, &self.ctx.config.docker.watchdog, now);
        self.ctx.apply(findings)
    }

    pub async fn check_critical_containers(&self, now: DateTime<Utc>) {
        let names = &self.ctx.config.docker.critical_containers.names;
        if names.is_empty() {
            return;
        }
        let containers = match self.probes.containers.list().await {
            Ok(containers) => containers,
            Err(e) => {
                tracing::warn!("Container listing failed: {}", e);
                return;
            }
        };
        let findings = self.ctx.containers.lock().await.check(names, &containers, now);
        self.ctx.apply(findings);
    }

    pub async fn prune_restarts(&self, now: DateTime<Utc>) {
        self.ctx.restarts.lock().await.prune(now);
    }

    pub async fn sample_trends(&self, now: DateTime<Utc>) {
        let stats = self.ctx.snapshot().await;
        self.ctx.trends.lock().await.sample(&stats, now);
    }

    pub async fn sample_disks(&self, now: DateTime<Utc>) {
        let stats = self.ctx.snapshot().await;
        if !stats.is_populated() {
            return;
        }
        let mut disks = self.ctx.disks.lock().await;
        disks.sample(&stats, now);
        let findings = disks.check(self.ctx.config.disk_prediction.warn_days, now);
        drop(disks);
        self.ctx.apply(findings);
    }

    /// Build and send the periodic report, then start a new period
    pub async fn send_report(&self, now: DateTime<Utc>) -> String {
        let stats = self.ctx.snapshot().await;
        let mut stress = self.ctx.stress.lock().await;
        let mut started = self.ctx.report_started.lock().await;
        let predictions = {
            let disks = self.ctx.disks.lock().await;
            stats
                .volumes
                .iter()
                .filter_map(|v| disks.days_until_full(v.label).map(|d| (v.label, d)))
                .collect()
        };
        let trends = self.ctx.trends.lock().await;

        let text = Report {
            host: sysinfo::System::host_name().unwrap_or_else(|| "host".to_string()),
            generated_at: now,
            period: now - *started,
            stats: &stats,
            trends: &trends,
            stress: stress.summaries(),
            predictions,
            counts: self.ctx.events.counts(),
        }
        .render();

        stress.reset_period();
        self.ctx.events.clear();
        *started = now;

        if !self.ctx.notifier.send(&text, false) {
            tracing::info!("Periodic report not delivered (quiet hours)");
        }
        text
    }

    /// Run until `shutdown` resolves. In-flight remediations are left to finish.
    pub async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        let config = self.ctx.config.clone();
        let collector = self.spawn_collector();
        tracing::info!("Scheduler started");

        let auto_restart = config.docker.auto_restart_on_ram_critical.enabled;
        let mut resources = ticker(config.stress.interval());
        let mut kernel = ticker(config.kernel.interval());
        let mut network = ticker(config.network.interval());
        let mut raid = ticker(config.raid.interval());
        let mut docker = ticker(config.docker.watchdog.interval());
        let mut containers = ticker(config.docker.critical_containers.interval());
        let mut restarts = delayed_ticker(RESTART_PRUNE_INTERVAL);
        let mut trends = ticker(config.trends.interval());
        let mut disks = ticker(config.disk_prediction.interval());
        let mut report = delayed_ticker(config.report.interval());

        loop {
            tokio::select! {
                _ = resources.tick(), if config.stress.enabled || auto_restart => {
                    self.check_resources(Utc::now()).await;
                }
                _ = kernel.tick(), if config.kernel.enabled => {
                    self.check_kernel(Utc::now()).await;
                }
                _ = network.tick(), if config.network.enabled => {
                    self.check_network(Utc::now()).await;
                }
                _ = raid.tick(), if config.raid.enabled => {
                    self.check_raid(Utc::now()).await;
                }
                _ = docker.tick(), if config.docker.watchdog.enabled => {
                    self.check_docker(Utc::now()).await;
                }
                _ = containers.tick(), if config.docker.critical_containers.enabled => {
                    self.check_critical_containers(Utc::now()).await;
                }
                _ = restarts.tick(), if auto_restart => {
                    self.prune_restarts(Utc::now()).await;
                }
                _ = trends.tick() => {
                    self.sample_trends(Utc::now()).await;
                }
                _ = disks.tick(), if config.disk_prediction.enabled => {
                    self.sample_disks(Utc::now()).await;
                }
                _ = report.tick(), if config.report.enabled => {
                    self.send_report(Utc::now()).await;
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    break;
                }
            }
        }

        collector.abort();
        tracing::info!("Scheduler stopped");
    }
}

fn ticker(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Like [`ticker`] but the first tick is one full period away
fn delayed_ticker(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
