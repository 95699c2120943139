// Executes remediation requests: systemd over D-Bus, docker through the executor

use crate::error::{Result, WatchError};
use crate::host::{RemediationExecutor, RetryPolicy, ServiceController};
use crate::watchdog::Remediation;
use std::sync::Arc;
use std::time::Duration;

pub const SERVICE_RESTART_TIMEOUT: Duration = Duration::from_secs(90);
pub const REBOOT_TIMEOUT: Duration = Duration::from_secs(30);

/// How far a service restart got before returning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceRestart {
    /// Job accepted by systemd over D-Bus; the unit may still be starting
    Queued,
    /// `systemctl restart` returned after the unit came back
    Completed,
}

impl ServiceRestart {
    pub fn describe(self) -> &'static str {
        match self {
            ServiceRestart::Queued => "restart requested",
            ServiceRestart::Completed => "restarted",
        }
    }
}

/// Carries out [`Remediation`] requests.
///
/// Service restarts and reboots prefer the systemd D-Bus API and fall back to
/// `systemctl` when no bus connection is available or the call fails.
#[derive(Clone)]
pub struct Remediator {
    systemd: Option<ServiceController>,
    executor: Arc<dyn RemediationExecutor>,
}

impl Remediator {
    pub fn new(systemd: Option<ServiceController>, executor: Arc<dyn RemediationExecutor>) -> Self {
        Self { systemd, executor }
    }

    /// Connect to systemd, degrading to the `systemctl` path on failure
    pub async fn connect(executor: Arc<dyn RemediationExecutor>, retry: &RetryPolicy) -> Self {
        let systemd = match ServiceController::connect(retry).await {
            Ok(controller) => Some(controller),
            Err(e) => {
                tracing::warn!("System bus unavailable, using systemctl for service control: {}", e);
                None
            }
        };
        Self::new(systemd, executor)
    }

    /// Run one action; returns the outcome text worth reporting, if any
    pub async fn execute(&self, action: &Remediation, timeout: Duration) -> Result<String> {
        match action {
            Remediation::RestartService(name) => self
                .restart_service(name, timeout)
                .await
                .map(|outcome| outcome.describe().to_string()),
            Remediation::RestartContainer(name) => self.restart_container(name, timeout).await.map(|_| String::new()),
            Remediation::PruneImages => self.prune_images(timeout).await,
            Remediation::Reboot => self.reboot().await.map(|_| String::new()),
        }
    }

    pub async fn restart_service(&self, name: &str, timeout: Duration) -> Result<ServiceRestart> {
        if let Some(controller) = &self.systemd {
            match tokio::time::timeout(timeout, controller.restart_service(name)).await {
                Ok(Ok(())) => return Ok(ServiceRestart::Queued),
                Ok(Err(e)) => tracing::warn!("D-Bus restart of {} failed, trying systemctl: {}", name, e),
                Err(_) => {
                    return Err(WatchError::Timeout {
                        command: format!("RestartUnit {}", name),
                        secs: timeout.as_secs(),
                    }
                    .into())
                }
            }
        }

        self.executor
            .run("systemctl", &["restart".to_string(), name.to_string()], timeout)
            .await?;
        Ok(ServiceRestart::Completed)
    }

    pub async fn restart_container(&self, name: &str, timeout: Duration) -> Result<()> {
        self.executor
            .run("docker", &["restart".to_string(), name.to_string()], timeout)
            .await?;
        Ok(())
    }

    /// Remove unused images; returns the reclaimed-space line
    pub async fn prune_images(&self, timeout: Duration) -> Result<String> {
        let output = self
            .executor
            .run(
                "docker",
                &["image".to_string(), "prune".to_string(), "-af".to_string()],
                timeout,
            )
            .await?;
        Ok(reclaimed_summary(&output))
    }

    /// Issued once; never retried
    pub async fn reboot(&self) -> Result<()> {
        tracing::error!("Rebooting host");
        if let Some(controller) = &self.systemd {
            match tokio::time::timeout(REBOOT_TIMEOUT, controller.reboot()).await {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(e)) => tracing::warn!("D-Bus reboot failed, trying systemctl: {}", e),
                Err(_) => tracing::warn!("D-Bus reboot timed out, trying systemctl"),
            }
        }

        self.executor
            .run("systemctl", &["reboot".to_string()], REBOOT_TIMEOUT)
            .await?;
        Ok(())
    }
}

pub(crate) fn reclaimed_summary(output: &str) -> String {
    output
        .lines()
        .rev()
        .find(|l| l.contains("reclaimed"))
        .or_else(|| output.lines().rev().find(|l| !l.trim().is_empty()))
        .unwrap_or("nothing to prune")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MockRemediationExecutor;

    #[test]
    fn test_reclaimed_summary() {
        let output = "Deleted Images:\nuntagged: nginx:1.25\n\nTotal reclaimed space: 1.2GB\n";
        assert_eq!(reclaimed_summary(output), "Total reclaimed space: 1.2GB");
        assert_eq!(reclaimed_summary("only line\n"), "only line");
        assert_eq!(reclaimed_summary(""), "nothing to prune");
    }

    #[tokio::test]
    async fn test_service_restart_without_bus_uses_systemctl() {
        let mut executor = MockRemediationExecutor::new();
        executor
            .expect_run()
            .withf(|command, args, _| command == "systemctl" && args.len() == 2 && args[1] == "docker.service")
            .times(1)
            .returning(|_, _, _| Ok(String::new()));

        let remediator = Remediator::new(None, Arc::new(executor));
        let result = remediator
            .execute(
                &Remediation::RestartService("docker.service".to_string()),
                Duration::from_secs(5),
            )
            .await;
        assert_eq!(result.unwrap(), "restarted");
    }

    #[test]
    fn test_service_restart_outcome_wording() {
        assert_eq!(ServiceRestart::Queued.describe(), "restart requested");
        assert_eq!(ServiceRestart::Completed.describe(), "restarted");
    }

    #[tokio::test]
    async fn test_prune_reports_reclaimed_space() {
        let mut executor = MockRemediationExecutor::new();
        executor
            .expect_run()
            .withf(|command, args, _| command == "docker" && args.len() == 3 && args[0] == "image")
            .times(1)
            .returning(|_, _, _| Ok("Total reclaimed space: 512MB\n".to_string()));

        let remediator = Remediator::new(None, Arc::new(executor));
        let summary = remediator.prune_images(Duration::from_secs(5)).await.unwrap();
        assert_eq!(summary, "Total reclaimed space: 512MB");
    }

    #[tokio::test]
    async fn test_failed_reboot_is_reported() {
        let mut executor = MockRemediationExecutor::new();
        executor.expect_run().times(1).returning(|command, _, _| {
            Err(WatchError::Command {
                command: command.to_string(),
                message: "Access denied".to_string(),
            }
            .into())
        });

        let remediator = Remediator::new(None, Arc::new(executor));
        assert!(remediator.execute(&Remediation::Reboot, REBOOT_TIMEOUT).await.is_err());
    }
}
