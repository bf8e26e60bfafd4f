//! Notifier trait definition and shared error types.

use std::collections::HashMap;

use serde::Serialize;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

/// A rendered notification ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    /// Human-readable subject line.
    pub subject: String,
    /// Message body; pretty-printed JSON for alert payloads.
    pub body: String,
    /// Additional metadata (e.g., alert name, record count).
    pub metadata: HashMap<String, String>,
}

impl Notification {
    /// Build a notification whose body is `payload` as indented JSON.
    pub fn json<T: Serialize + ?Sized>(
        subject: impl Into<String>,
        payload: &T,
    ) -> Result<Self, NotifyError> {
        Ok(Self {
            subject: subject.into(),
            body: serde_json::to_string_pretty(payload)?,
            metadata: HashMap::from([(
                "generated_at".to_string(),
                chrono::Utc::now().to_rfc3339(),
            )]),
        })
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Trait for notification channel implementations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification through this channel.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Human-readable name for this channel (e.g., "webhook", "log").
    fn channel_name(&self) -> &str;
}
