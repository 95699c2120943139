// Host probes: the leaf producers the watchdogs consume

pub mod control;
pub mod docker;
pub mod executor;
pub mod journal;
pub mod metrics;
pub mod models;
pub mod network;
pub mod raid;
pub mod resilience;


use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub use control::ServiceController;
pub use docker::DockerCli;
pub use executor::SystemExecutor;
pub use journal::KernelJournal;
pub use metrics::SysinfoMetrics;
pub use models::{
    format_bytes, format_duration, ContainerInfo, ContainerUsage, LoadAverage, ProcessUsage, Stats,
    VolumeLabel, VolumeUsage,
};
pub use network::SystemNetworkProbe;
pub use raid::MdstatProbe;
pub use resilience::{RecoveryStrategy, RetryPolicy};

/// Periodic host metrics snapshot. Never fails: missing values are zero.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn collect(&self) -> Stats;
}

/// Container runtime listing
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerRuntimeProbe: Send + Sync {
    async fn list(&self) -> Result<Vec<ContainerInfo>>;
    async fn usage(&self) -> Result<Vec<ContainerUsage>>;
}

/// Recent kernel log lines, oldest first. Empty on failure.
#[async_trait]
pub trait KernelLogSource: Send + Sync {
    async fn tail(&self) -> Vec<String>;
}

#[async_trait]
pub trait NetworkProbe: Send + Sync {
    async fn ping(&self, host: &str, timeout: Duration) -> bool;
    async fn resolve_dns(&self, host: &str, timeout: Duration) -> bool;
}

/// Software RAID / ZFS pool problems, one human-readable string per issue
#[async_trait]
pub trait RaidProbe: Send + Sync {
    async fn status(&self) -> Vec<String>;
}

/// Runs an OS command with a bounded timeout, returning its stdout
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemediationExecutor: Send + Sync {
    async fn run(&self, command: &str, args: &[String], timeout: Duration) -> Result<String>;
}
