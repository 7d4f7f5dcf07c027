//! Analytics delivery seam.
//!
//! Notable engine moments (request created, call accepted, call completed)
//! are forwarded to an [`AnalyticsSink`]. Delivery is strictly
//! fire-and-forget: the webhook sink spawns its POST and logs failures at
//! `warn`, and nothing in the call path ever waits on it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// One analytics datapoint.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    /// Event name, e.g. `call.completed`.
    pub name: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Event-specific payload.
    pub data: Value,
}

impl AnalyticsEvent {
    /// Build an event stamped with the current time.
    #[must_use]
    pub fn now(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            timestamp: Utc::now(),
            data,
        }
    }
}

/// Destination for analytics events. Implementations must not block.
pub trait AnalyticsSink: Send + Sync {
    /// Hand off one event for delivery.
    fn deliver(&self, event: AnalyticsEvent);
}

/// Sink that discards everything. Used when no webhook is configured.
#[derive(Debug, Default)]
pub struct NoopSink;

impl AnalyticsSink for NoopSink {
    fn deliver(&self, event: AnalyticsEvent) {
        debug!(name = %event.name, "analytics disabled, dropping event");
    }
}

/// Sink that POSTs each event as JSON to a configured webhook.
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    /// Build a sink targeting `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

impl AnalyticsSink for WebhookSink {
    fn deliver(&self, event: AnalyticsEvent) {
        let client = self.client.clone();
        let url = self.url.clone();
        tokio::spawn(async move {
            let name = event.name.clone();
            match client.post(&url).json(&event).send().await {
                Ok(resp) if !resp.status().is_success() => {
                    warn!(name = %name, status = %resp.status(), "analytics webhook rejected event");
                }
                Ok(_) => debug!(name = %name, "analytics event delivered"),
                Err(err) => warn!(name = %name, error = %err, "analytics webhook unreachable"),
            }
        });
    }
}

/// Recording sink for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl MemorySink {
    /// Create an empty recording sink.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Names of the events delivered so far, in order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.name.clone()).collect()
    }

    /// All events delivered so far.
    #[must_use]
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.lock().clone()
    }
}

impl AnalyticsSink for MemorySink {
    fn deliver(&self, event: AnalyticsEvent) {
        self.events.lock().push(event);
    }
}
