//! Notification port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PortError;
use crate::types::ContextMap;

/// Priority level of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// An outbound notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Destination channel, e.g. `"compliance"`.
    pub channel: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub priority: NotificationPriority,
    #[serde(default)]
    pub metadata: ContextMap,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        channel: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            title: title.into(),
            message: message.into(),
            priority: NotificationPriority::Normal,
            metadata: ContextMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), PortError>;
}
