// ICMP reachability and DNS resolution probes

use crate::host::NetworkProbe;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

#[derive(Debug, Clone, Default)]
pub struct SystemNetworkProbe;

#[async_trait]
impl NetworkProbe for SystemNetworkProbe {
    async fn ping(&self, host: &str, timeout: Duration) -> bool {
        if host.is_empty() || host.starts_with('-') {
            return false;
        }

        let wait_secs = timeout.as_secs().max(1).to_string();
        let child = Command::new("ping")
            .args(["-c", "1", "-W", &wait_secs, host])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        let mut child = match child {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!("Failed to spawn ping: {}", e);
                return false;
            }
        };

        // Allow the process a little longer than its own -W deadline
        match tokio::time::timeout(timeout + Duration::from_secs(1), child.wait()).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                tracing::debug!("ping {} failed: {}", host, e);
                false
            }
            Err(_) => {
                tracing::debug!("ping {} timed out", host);
                false
            }
        }
    }

    async fn resolve_dns(&self, host: &str, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, tokio::net::lookup_host((host, 0))).await {
            Ok(Ok(mut addrs)) => addrs.next().is_some(),
            Ok(Err(e)) => {
                tracing::debug!("DNS lookup for {} failed: {}", host, e);
                false
            }
            Err(_) => {
                tracing::debug!("DNS lookup for {} timed out", host);
                false
            }
        }
    }
}
