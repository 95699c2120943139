// Retry handling for flaky external calls (D-Bus, notification delivery)

use crate::error::{Result, WatchError};
use std::time::Duration;
use tokio::time::sleep;
use zbus::Connection;

/// Retry policy with a pluggable backoff strategy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: usize,
    strategy: RecoveryStrategy,
    connection_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            strategy: RecoveryStrategy::FixedDelay(Duration::from_millis(500)),
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Create a retry policy with custom settings
    pub fn new(max_retries: usize, strategy: RecoveryStrategy, connection_timeout: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            strategy,
            connection_timeout,
        }
    }

    /// Notification delivery: more attempts, backing off exponentially up to 30s
    pub fn delivery() -> Self {
        Self::new(4, RecoveryStrategy::default(), Duration::from_secs(10))
    }

    /// Maximum attempts per operation
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn strategy(&self) -> &RecoveryStrategy {
        &self.strategy
    }

    /// Establish a systemd system-bus connection with retry logic
    pub async fn connect_systemd(&self) -> Result<Connection> {
        self.with_retry("systemd connection", || async {
            let conn = tokio::time::timeout(self.connection_timeout, Connection::system())
                .await
                .map_err(|_| WatchError::SystemdConnection("Connection timeout".to_string()))?
                .map_err(|e| WatchError::SystemdConnection(format!("Failed to connect: {}", e)))?;

            Ok(conn)
        })
        .await
    }

    /// Execute an operation with automatic retry
    pub async fn with_retry<F, T, Fut>(&self, operation_name: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        tracing::info!("Operation '{}' succeeded on attempt {}", operation_name, attempt);
                    }
                    return Ok(result);
                }
                Err(error) => {
                    tracing::warn!("Operation '{}' failed on attempt {}: {}", operation_name, attempt, error);
                    let fatal = Self::should_not_retry(&error);
                    last_error = Some(error);

                    if fatal {
                        break;
                    }

                    if attempt < self.max_retries {
                        let delay = self.strategy.delay(attempt);
                        tracing::debug!("Retrying in {:?}...", delay);
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            WatchError::Command {
                command: operation_name.to_string(),
                message: "No error recorded during retry".to_string(),
            }
            .into()
        }))
    }

    /// Errors that will not go away by trying again
    fn should_not_retry(error: &anyhow::Error) -> bool {
        let error_str = error.to_string().to_lowercase();

        error_str.contains("permission denied")
            || error_str.contains("access denied")
            || error_str.contains("unauthorized")
            || error_str.contains("invalid argument")
            || error_str.contains("no such file")
    }
}

/// Backoff between retry attempts
#[derive(Debug, Clone)]
pub enum RecoveryStrategy {
    /// Retry immediately
    Immediate,
    /// Exponential backoff
    ExponentialBackoff { base_delay: Duration, max_delay: Duration, multiplier: f64 },
    /// Fixed delay
    FixedDelay(Duration),
}

impl Default for RecoveryStrategy {
    fn default() -> Self {
        Self::ExponentialBackoff {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RecoveryStrategy {
    /// Get delay for a specific attempt
    pub fn delay(&self, attempt: usize) -> Duration {
        match self {
            RecoveryStrategy::Immediate => Duration::from_millis(0),
            RecoveryStrategy::FixedDelay(duration) => *duration,
            RecoveryStrategy::ExponentialBackoff { base_delay, max_delay, multiplier } => {
                let delay_ms = base_delay.as_millis() as f64 * multiplier.powi(attempt as i32 - 1);
                let delay = Duration::from_millis(delay_ms as u64);
                delay.min(*max_delay)
            }
        }
    }
}
