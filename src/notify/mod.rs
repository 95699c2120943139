// Operator notifications: quiet-hours gate, queue and delivery task

mod quiet;
mod transport;

pub use quiet::QuietHours;
pub use transport::{LogTransport, TelegramTransport, Transport};

use crate::config::NotificationConfig;
use crate::error::Result;
use crate::host::RetryPolicy;
use chrono::{Local, NaiveTime};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

/// Quiet-hours-aware notification queue.
///
/// `send` never blocks: accepted messages are queued for the delivery task
/// started with [`spawn_delivery`]. Messages sent with `bypass_quiet` are
/// delivered even inside the quiet window.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<String>,
    quiet: QuietHours,
}

impl Notifier {
    pub fn new(quiet: QuietHours) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, quiet }, rx)
    }

    /// Queue a message. Returns false when it was suppressed or the queue is closed.
    pub fn send(&self, message: &str, bypass_quiet: bool) -> bool {
        self.send_at(message, bypass_quiet, Local::now().time())
    }

    pub(crate) fn send_at(&self, message: &str, bypass_quiet: bool, time: NaiveTime) -> bool {
        if !bypass_quiet && self.quiet.contains(time) {
            tracing::debug!("Suppressed during quiet hours: {}", first_line(message));
            return false;
        }

        if self.tx.send(message.to_string()).is_err() {
            tracing::warn!("Notification queue closed, dropping: {}", first_line(message));
            return false;
        }
        true
    }

    pub fn in_quiet_hours(&self) -> bool {
        self.quiet.is_active_now()
    }

    pub fn quiet_hours(&self) -> QuietHours {
        self.quiet
    }
}

/// Pick the transport for the configured channel
pub fn transport_from_config(config: &NotificationConfig) -> Result<Arc<dyn Transport>> {
    match &config.telegram {
        Some(telegram) => Ok(Arc::new(TelegramTransport::new(telegram)?)),
        None => {
            tracing::warn!("No notification channel configured, notifications go to the log only");
            Ok(Arc::new(LogTransport))
        }
    }
}

/// Drain the queue through `transport` until every `Notifier` is dropped
pub fn spawn_delivery(
    rx: mpsc::UnboundedReceiver<String>,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut queue = UnboundedReceiverStream::new(rx);
        while let Some(message) = queue.next().await {
            let result = retry
                .with_retry("notification delivery", || transport.deliver(&message))
                .await;
            if let Err(e) = result {
                tracing::error!(
                    "Dropping notification after {} delivery failures: {}",
                    transport.name(),
                    e
                );
            }
        }
        tracing::info!("Notification delivery stopped");
    })
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or("")
}
