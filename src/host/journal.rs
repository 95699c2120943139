// Kernel ring-buffer reader

use crate::host::KernelLogSource;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Reads the kernel log through `journalctl -k`, falling back to `dmesg`
#[derive(Debug, Clone)]
pub struct KernelJournal {
    lines: usize,
}

impl KernelJournal {
    pub fn new(lines: usize) -> Self {
        Self { lines: lines.max(1) }
    }

    async fn read(program: &str, args: &[String]) -> Option<String> {
        let child = Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| tracing::debug!("Failed to spawn {}: {}", program, e))
            .ok()?;

        match tokio::time::timeout(READ_TIMEOUT, child.wait_with_output()).await {
            Ok(Ok(output)) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(Ok(output)) => {
                tracing::debug!("{} exited with {}", program, output.status);
                None
            }
            Ok(Err(e)) => {
                tracing::debug!("{} failed: {}", program, e);
                None
            }
            Err(_) => {
                tracing::warn!("{} timed out after {:?}", program, READ_TIMEOUT);
                None
            }
        }
    }
}

#[async_trait]
impl KernelLogSource for KernelJournal {
    async fn tail(&self) -> Vec<String> {
        let journal_args = vec![
            "-k".to_string(),
            "--no-pager".to_string(),
            "--output=short-precise".to_string(),
            "-n".to_string(),
            self.lines.to_string(),
        ];

        let text = match Self::read("journalctl", &journal_args).await {
            Some(text) => text,
            None => match Self::read("dmesg", &["-T".to_string()]).await {
                Some(text) => text,
                None => {
                    tracing::warn!("Kernel log unavailable (journalctl and dmesg both failed)");
                    return Vec::new();
                }
            },
        };

        last_lines(&text, self.lines)
    }
}

/// Keep the last `n` non-empty lines, oldest first
pub(crate) fn last_lines(text: &str, n: usize) -> Vec<String> {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let skip = lines.len().saturating_sub(n);
    lines[skip..].iter().map(|l| l.to_string()).collect()
}
