// Systemd service control over D-Bus

use crate::error::{Result, WatchError};
use crate::host::RetryPolicy;
use zbus::Connection;

/// Restarts units and reboots the host through org.freedesktop.systemd1
#[derive(Clone)]
pub struct ServiceController {
    connection: Connection,
}

impl ServiceController {
    /// Connect to the system bus, retrying transient failures
    pub async fn connect(retry: &RetryPolicy) -> Result<Self> {
        let connection = retry.connect_systemd().await?;
        Ok(Self { connection })
    }

    async fn manager(&self) -> Result<zbus::Proxy<'_>> {
        let proxy = zbus::Proxy::new(
            &self.connection,
            "org.freedesktop.systemd1",
            "/org/freedesktop/systemd1",
            "org.freedesktop.systemd1.Manager",
        )
        .await
        .map_err(|e| WatchError::SystemdConnection(e.to_string()))?;
        Ok(proxy)
    }

    /// Restart a service unit
    pub async fn restart_service(&self, service_name: &str) -> Result<()> {
        validate_service_name(service_name)?;

        let proxy = self.manager().await?;
        let _job_path: zbus::zvariant::OwnedObjectPath = proxy
            .call("RestartUnit", &(service_name, "replace"))
            .await
            .map_err(|e| control_error(service_name, "restart", e))?;

        tracing::info!("Restart job queued for {}", service_name);
        Ok(())
    }

    /// Ask systemd to reboot the machine
    pub async fn reboot(&self) -> Result<()> {
        let proxy = self.manager().await?;
        proxy
            .call::<_, _, ()>("Reboot", &())
            .await
            .map_err(|e| control_error("system", "reboot", e))?;
        Ok(())
    }
}

fn control_error(service: &str, operation: &str, e: zbus::Error) -> anyhow::Error {
    let error_msg = e.to_string();
    let message = if error_msg.contains("Access denied") || error_msg.contains("Authentication") {
        "Access denied. Run hostwarden as root or grant it polkit rights.".to_string()
    } else {
        format!("Failed to {}: {}", operation, e)
    };
    WatchError::ServiceControl {
        service: service.to_string(),
        message,
    }
    .into()
}

/// Validate service name format and prevent injection
pub(crate) fn validate_service_name(service_name: &str) -> Result<()> {
    if service_name.is_empty() {
        return Err(anyhow::anyhow!("Service name cannot be empty"));
    }

    if service_name.contains("..") || service_name.contains('\0') || service_name.len() > 256 {
        return Err(anyhow::anyhow!("Invalid service name format"));
    }

    if !service_name.ends_with(".service") {
        return Err(anyhow::anyhow!("Service name must end with .service"));
    }

    Ok(())
}
