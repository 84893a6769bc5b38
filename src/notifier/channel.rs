// src/notifier/channel.rs

//! Outbound notification channels.

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::{EmailConfig, SmsConfig};

/// Kind of outbound channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Email,
    Sms,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Email => write!(f, "email"),
            ChannelKind::Sms => write!(f, "sms"),
        }
    }
}

/// One way of reaching a subscriber.
///
/// A channel switched off in configuration accepts every message and sends
/// nothing, so callers treat the send as delivered.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}

/// Transactional email over a JSON HTTP API.
pub struct EmailChannel {
    client: Client,
    config: EmailConfig,
}

impl EmailChannel {
    pub fn new(client: Client, config: EmailConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        if !self.config.enabled {
            log::info!("Email is turned off, not sending '{subject}' to {recipient}");
            return Ok(());
        }

        log::info!("Sending email '{subject}' to {recipient}");
        let payload = json!({
            "personalizations": [{ "to": [{ "email": recipient }] }],
            "from": { "email": self.config.from_email, "name": self.config.from_name },
            "subject": subject,
            "content": [{ "type": "text/plain", "value": body }],
        });

        self.client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| AppError::channel("email", e))?;
        Ok(())
    }
}

/// SMS over an HTTP GET gateway.
pub struct SmsChannel {
    client: Client,
    config: SmsConfig,
}

impl SmsChannel {
    pub fn new(client: Client, config: SmsConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl NotificationChannel for SmsChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    /// The gateway has no subject; only `body` is sent.
    async fn send(&self, recipient: &str, _subject: &str, body: &str) -> Result<()> {
        if !self.config.enabled {
            log::info!("SMS is turned off, not texting {recipient}");
            return Ok(());
        }

        log::info!("Sending SMS to {recipient}");
        self.client
            .get(&self.config.endpoint)
            .query(&[
                ("username", self.config.username.as_str()),
                ("password", self.config.password.as_str()),
                ("destination", recipient),
                ("originatortype", "alpha"),
                ("originator", self.config.originator.as_str()),
                ("charset", "UTF-8"),
                ("text", body),
            ])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| AppError::channel("sms", e))?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_channels_are_noop_success() {
        let client = Client::new();
        let email = EmailChannel::new(client.clone(), EmailConfig::default());
        let sms = SmsChannel::new(client, SmsConfig::default());

        assert!(email.send("anna@example.com", "Hej", "Text").await.is_ok());
        assert!(sms.send("+46700000000", "", "Text").await.is_ok());
        assert_eq!(email.kind(), ChannelKind::Email);
        assert_eq!(sms.kind().to_string(), "sms");
    }
}
