// Network reachability aggregation

use crate::config::NetworkConfig;
use crate::events::Severity;
use crate::host::{format_duration, NetworkProbe};
use crate::watchdog::{Event, Findings};
use chrono::{DateTime, Duration, Utc};

/// Outcome of one probe round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkCheck {
    /// `None` when no gateway is configured
    pub gateway_ok: Option<bool>,
    pub ping_ok: bool,
    pub dns_ok: bool,
}

impl NetworkCheck {
    /// Probe gateway, then targets in order (first success wins); DNS runs alongside
    pub async fn probe(probe: &dyn NetworkProbe, config: &NetworkConfig) -> Self {
        let timeout = config.timeout();
        let targets = config.targets();

        let reachability = async {
            let gateway_ok = match &config.gateway {
                Some(gateway) if !gateway.is_empty() => Some(probe.ping(gateway, timeout).await),
                _ => None,
            };

            if gateway_ok == Some(false) {
                return (gateway_ok, false);
            }
            for target in &targets {
                if probe.ping(target, timeout).await {
                    return (gateway_ok, true);
                }
            }
            (gateway_ok, false)
        };

        let ((gateway_ok, targets_ok), dns_ok) =
            futures::join!(reachability, probe.resolve_dns(&config.dns_host, timeout));

        Self {
            gateway_ok,
            ping_ok: gateway_ok != Some(false) && targets_ok,
            dns_ok,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetworkWatchdog {
    fail_count: u32,
    down_since: Option<DateTime<Utc>>,
    down_alert_time: Option<DateTime<Utc>>,
    dns_alert_time: Option<DateTime<Utc>>,
}

impl NetworkWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_count(&self) -> u32 {
        self.fail_count
    }

    pub fn down_since(&self) -> Option<DateTime<Utc>> {
        self.down_since
    }

    pub fn check(
        &mut self,
        result: NetworkCheck,
        failure_threshold: u32,
        cooldown: Duration,
        notify_recovery: bool,
        now: DateTime<Utc>,
    ) -> Findings {
        let mut findings = Findings::default();

        match (result.ping_ok, result.dns_ok) {
            (true, true) => {
                self.fail_count = 0;
                if let Some(since) = self.down_since.take() {
                    self.down_alert_time = None;
                    let message = format!(
                        "✅ Network restored after {}",
                        format_duration(now - since)
                    );
                    if notify_recovery {
                        findings.push(Event::notify(Severity::Info, message));
                    } else {
                        findings.push(Event::log(Severity::Info, message));
                    }
                }
            }
            // DNS-only degradation is alerted on cooldown alone; fail_count is untouched
            (true, false) => {
                if cooled_down(self.dns_alert_time, cooldown, now) {
                    self.dns_alert_time = Some(now);
                    findings.push(Event::notify(
                        Severity::Warning,
                        "⚠️ DNS resolution failing while hosts are reachable",
                    ));
                }
            }
            (false, _) => {
                self.fail_count = self.fail_count.saturating_add(1);
                tracing::debug!(
                    "Network check failed ({}/{})",
                    self.fail_count,
                    failure_threshold
                );
                if self.fail_count < failure_threshold {
                    return findings;
                }

                let since = *self.down_since.get_or_insert(now);
                if cooled_down(self.down_alert_time, cooldown, now) {
                    self.down_alert_time = Some(now);
                    let cause = match result.gateway_ok {
                        Some(false) => "gateway unreachable",
                        _ if result.dns_ok => "no ping target reachable",
                        _ => "no ping target reachable and DNS failing",
                    };
                    findings.push(Event::notify(
                        Severity::Critical,
                        format!(
                            "🌐 Network down: {} ({} consecutive failures, down for {})",
                            cause,
                            self.fail_count,
                            format_duration(now - since)
                        ),
                    ));
                }
            }
        }

        findings
    }

    pub fn check_with_config(&mut self, result: NetworkCheck, config: &NetworkConfig, now: DateTime<Utc>) -> Findings {
        self.check(
            result,
            config.threshold(),
            config.cooldown(),
            config.notify_recovery,
            now,
        )
    }
}

/// True if there was no previous alert or `cooldown` has passed since it
pub(crate) fn cooled_down(last: Option<DateTime<Utc>>, cooldown: Duration, now: DateTime<Utc>) -> bool {
    match last {
        None => true,
        Some(last) => now - last >= cooldown,
    }
}
