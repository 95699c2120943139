// Docker runtime probe backed by the docker CLI

use crate::error::{Result, WatchError};
use crate::host::{ContainerInfo, ContainerRuntimeProbe, ContainerUsage, RemediationExecutor};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const DOCKER_TIMEOUT: Duration = Duration::from_secs(15);

pub struct DockerCli {
    executor: Arc<dyn RemediationExecutor>,
}

impl DockerCli {
    pub fn new(executor: Arc<dyn RemediationExecutor>) -> Self {
        Self { executor }
    }

    async fn docker(&self, args: &[&str]) -> Result<String> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.executor
            .run("docker", &args, DOCKER_TIMEOUT)
            .await
            .map_err(|e| {
                WatchError::Probe {
                    probe: format!("docker {}", args.first().map(String::as_str).unwrap_or("")),
                    message: e.to_string(),
                }
                .into()
            })
    }
}

#[async_trait]
impl ContainerRuntimeProbe for DockerCli {
    async fn list(&self) -> Result<Vec<ContainerInfo>> {
        let output = self
            .docker(&["ps", "-a", "--format", "{{.Names}}\t{{.State}}"])
            .await?;
        Ok(parse_ps_output(&output))
    }

    async fn usage(&self) -> Result<Vec<ContainerUsage>> {
        let containers = self.list().await?;
        let output = self
            .docker(&["stats", "--no-stream", "--format", "{{.Name}}\t{{.MemPerc}}"])
            .await?;
        let mem = parse_stats_output(&output);

        Ok(containers
            .into_iter()
            .map(|c| ContainerUsage {
                memory_percent: mem.get(&c.name).copied().unwrap_or(0.0),
                name: c.name,
                running: c.running,
            })
            .collect())
    }
}

/// Parse `docker ps --format "{{.Names}}\t{{.State}}"`
pub(crate) fn parse_ps_output(output: &str) -> Vec<ContainerInfo> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split('\t');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let state = parts.next().unwrap_or("").trim();
            Some(ContainerInfo {
                name: name.to_string(),
                running: state.eq_ignore_ascii_case("running"),
            })
        })
        .collect()
}

/// Parse `docker stats --format "{{.Name}}\t{{.MemPerc}}"` into name -> percent
pub(crate) fn parse_stats_output(output: &str) -> HashMap<String, f64> {
    output
        .lines()
        .filter_map(|line| {
            let (name, perc) = line.split_once('\t')?;
            let value = perc.trim().trim_end_matches('%').parse::<f64>().ok()?;
            Some((name.trim().to_string(), value))
        })
        .collect()
}
