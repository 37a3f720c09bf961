//! Analytics sink client

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{Error, Result};

pub const TODO_COMPLETED: &str = "todo_completed";
pub const TODO_UNCOMPLETED: &str = "todo_uncompleted";

const PUBLISH_PATH: &str = "analytics.v1.AnalyticsService/PublishEvent";

/// One analytics event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub name: String,
    pub user_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl AnalyticsEvent {
    /// Event emitted when a todo's done flag is set
    pub fn todo_toggled(user_id: Uuid, todo_id: Uuid, done: bool, occurred_at: DateTime<Utc>) -> Self {
        let name = if done { TODO_COMPLETED } else { TODO_UNCOMPLETED };
        let mut properties = BTreeMap::new();
        properties.insert("todo_id".to_string(), todo_id.to_string());
        Self {
            name: name.to_string(),
            user_id,
            occurred_at,
            properties,
        }
    }
}

/// Destination for analytics events
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn publish_event(&self, event: AnalyticsEvent) -> Result<()>;
}

/// Sink that posts events as JSON to the analytics service
#[derive(Clone)]
pub struct HttpAnalyticsSink {
    client: Client,
    endpoint: String,
}

impl HttpAnalyticsSink {
    /// Create a sink for the service at `base_url`
    ///
    /// `timeout` bounds each request at the transport level.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(Error::Http)?;

        let base_url = if base_url.starts_with("http://") || base_url.starts_with("https://") {
            base_url.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", base_url.trim_end_matches('/'))
        };

        Ok(Self {
            client,
            endpoint: format!("{}/{}", base_url, PUBLISH_PATH),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AnalyticsSink for HttpAnalyticsSink {
    async fn publish_event(&self, event: AnalyticsEvent) -> Result<()> {
        debug!("Publishing analytics event {} to {}", event.name, self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&event)
            .send()
            .await
            .map_err(Error::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Internal(format!("analytics service returned {}: {}", status, body)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_todo_toggled_event() {
        let user = Uuid::new_v4();
        let todo = Uuid::new_v4();
        let event = AnalyticsEvent::todo_toggled(user, todo, true, Utc::now());
        assert_eq!(event.name, "todo_completed");
        assert_eq!(event.properties.get("todo_id"), Some(&todo.to_string()));

        let event = AnalyticsEvent::todo_toggled(user, todo, false, Utc::now());
        assert_eq!(event.name, "todo_uncompleted");
    }

    #[test]
    fn test_wire_shape() {
        let event = AnalyticsEvent::todo_toggled(Uuid::nil(), Uuid::nil(), true, Utc::now());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["name"], "todo_completed");
        assert_eq!(json["user_id"], "00000000-0000-0000-0000-000000000000");
        assert!(json["occurred_at"].is_string());
        assert_eq!(json["properties"]["todo_id"], "00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn test_endpoint_normalisation() {
        let sink = HttpAnalyticsSink::new("analytics:9000", Duration::from_millis(500)).unwrap();
        assert_eq!(sink.endpoint(), "http://analytics:9000/analytics.v1.AnalyticsService/PublishEvent");

        let sink = HttpAnalyticsSink::new("https://analytics.example/", Duration::from_millis(500)).unwrap();
        assert_eq!(sink.endpoint(), "https://analytics.example/analytics.v1.AnalyticsService/PublishEvent");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_an_error() {
        let sink = HttpAnalyticsSink::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let event = AnalyticsEvent::todo_toggled(Uuid::new_v4(), Uuid::new_v4(), true, Utc::now());
        assert!(sink.publish_event(event).await.is_err());
    }
}
