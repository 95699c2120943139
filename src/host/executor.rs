// OS command execution with bounded timeouts

use crate::error::{Result, WatchError};
use crate::host::RemediationExecutor;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Executes commands through `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct SystemExecutor;

#[async_trait]
impl RemediationExecutor for SystemExecutor {
    async fn run(&self, command: &str, args: &[String], timeout: Duration) -> Result<String> {
        validate_command(command)?;

        let child = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| WatchError::Command {
                command: command.to_string(),
                message: format!("Failed to spawn: {}", e),
            })?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| WatchError::Timeout {
                command: command.to_string(),
                secs: timeout.as_secs(),
            })?
            .map_err(|e| WatchError::Command {
                command: command.to_string(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(WatchError::Command {
                command: format!("{} {}", command, args.join(" ")),
                message: if stderr.is_empty() {
                    format!("exited with {}", output.status)
                } else {
                    stderr
                },
            }
            .into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Reject empty or path-traversing program names
pub(crate) fn validate_command(command: &str) -> Result<()> {
    if command.is_empty() {
        return Err(anyhow::anyhow!("Command cannot be empty"));
    }

    if command.contains("..") || command.contains('\0') || command.len() > 256 {
        return Err(anyhow::anyhow!("Invalid command format"));
    }

    Ok(())
}
