// Error types for hostwarden

use thiserror::Error;

/// Result type alias using anyhow::Error
pub type Result<T> = anyhow::Result<T>;

/// Hostwarden-specific error types
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Probe '{probe}' failed: {message}")]
    Probe { probe: String, message: String },

    #[error("Command '{command}' failed: {message}")]
    Command { command: String, message: String },

    #[error("Command '{command}' timed out after {secs}s")]
    Timeout { command: String, secs: u64 },

    #[error("Failed to control service '{service}': {message}")]
    ServiceControl { service: String, message: String },

    #[error("Failed to connect to systemd D-Bus: {0}")]
    SystemdConnection(String),

    #[error("Notification delivery failed: {0}")]
    Notify(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
