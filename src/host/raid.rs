// Software RAID (md) and ZFS pool health

use crate::host::{RaidProbe, RemediationExecutor};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub struct MdstatProbe {
    mdstat_path: PathBuf,
    executor: Option<Arc<dyn RemediationExecutor>>,
}

impl MdstatProbe {
    /// Probe `/proc/mdstat`, and ZFS pools when an executor is given
    pub fn new(executor: Option<Arc<dyn RemediationExecutor>>) -> Self {
        Self {
            mdstat_path: PathBuf::from("/proc/mdstat"),
            executor,
        }
    }

    pub fn with_mdstat_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.mdstat_path = path.into();
        self
    }

    async fn zpool_issues(&self) -> Vec<String> {
        let Some(executor) = &self.executor else {
            return Vec::new();
        };

        let args = vec!["status".to_string(), "-x".to_string()];
        match executor.run("zpool", &args, Duration::from_secs(10)).await {
            Ok(output) => parse_zpool_status(&output),
            Err(e) => {
                // zpool missing is the normal case on hosts without ZFS
                tracing::debug!("zpool status unavailable: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl RaidProbe for MdstatProbe {
    async fn status(&self) -> Vec<String> {
        let mut issues = match tokio::fs::read_to_string(&self.mdstat_path).await {
            Ok(content) => parse_mdstat(&content),
            Err(e) => {
                tracing::debug!("Cannot read {}: {}", self.mdstat_path.display(), e);
                Vec::new()
            }
        };
        issues.extend(self.zpool_issues().await);
        issues
    }
}

/// Extract degraded/failed/rebuilding arrays from /proc/mdstat
pub(crate) fn parse_mdstat(content: &str) -> Vec<String> {
    let mut issues = Vec::new();
    let mut current: Option<String> = None;

    for line in content.lines() {
        if let Some((name, rest)) = line.split_once(" : ") {
            let name = name.trim();
            if name.starts_with("md") {
                current = Some(name.to_string());
                if rest.contains("(F)") {
                    issues.push(format!("{}: failed member device", name));
                }
                if rest.contains("inactive") {
                    issues.push(format!("{}: array inactive", name));
                }
                continue;
            }
        }

        let Some(array) = current.as_deref() else {
            continue;
        };

        // Member status such as "[2/1] [U_]"; '_' marks a missing disk
        if let Some(status) = line.split_whitespace().last() {
            if status.starts_with('[') && status.ends_with(']') && status.contains('_') {
                issues.push(format!("{}: degraded {}", array, status));
            }
        }

        // Progress percentages are left out so the signature stays stable while rebuilding
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') {
            if line.contains("recovery") {
                issues.push(format!("{}: recovery in progress", array));
            } else if line.contains("resync") {
                issues.push(format!("{}: resync in progress", array));
            }
        }
    }

    issues
}

/// Extract unhealthy pools from `zpool status -x`
pub(crate) fn parse_zpool_status(output: &str) -> Vec<String> {
    let trimmed = output.trim();
    if trimmed.is_empty()
        || trimmed.contains("all pools are healthy")
        || trimmed.contains("no pools available")
    {
        return Vec::new();
    }

    let mut issues = Vec::new();
    let mut pool: Option<&str> = None;
    for line in trimmed.lines() {
        let line = line.trim();
        if let Some(name) = line.strip_prefix("pool:") {
            pool = Some(name.trim());
        } else if let Some(state) = line.strip_prefix("state:") {
            let state = state.trim();
            if state != "ONLINE" {
                issues.push(format!("zfs {}: {}", pool.unwrap_or("?"), state));
            }
        }
    }
    issues
}
