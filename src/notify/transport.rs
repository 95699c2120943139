// Notification delivery transports

use crate::config::TelegramConfig;
use crate::error::{Result, WatchError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delivers one rendered message to the operator
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;
    async fn deliver(&self, text: &str) -> Result<()>;
}

/// Telegram Bot API `sendMessage`
pub struct TelegramTransport {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

impl TelegramTransport {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        if config.bot_token.trim().is_empty() || config.chat_id.trim().is_empty() {
            return Err(WatchError::Config("telegram bot_token and chat_id are required".to_string()).into());
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("hostwarden/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("https://api.telegram.org/bot{}/sendMessage", config.bot_token.trim()),
            chat_id: config.chat_id.trim().to_string(),
        })
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn deliver(&self, text: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
                disable_web_page_preview: true,
            })
            .send()
            .await
            .map_err(|e| WatchError::Notify(format!("request failed: {}", e.without_url())))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(WatchError::Notify("unauthorized: check bot_token".to_string()).into());
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| WatchError::Notify(format!("invalid response ({}): {}", status, e.without_url())))?;

        if !body.ok {
            return Err(WatchError::Notify(
                body.description.unwrap_or_else(|| format!("API returned status {}", status)),
            )
            .into());
        }

        Ok(())
    }
}

/// Writes messages to the log; used when no remote transport is configured
#[derive(Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl Transport for LogTransport {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, text: &str) -> Result<()> {
        tracing::info!("notification: {}", text);
        Ok(())
    }
}
