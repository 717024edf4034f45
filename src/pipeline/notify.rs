//! Outbound pipeline notifications
//!
//! Fire-and-forget progress events for a real-time layer. Delivery
//! failure is logged and swallowed; it never fails the pipeline.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{StageName, StageStatus};

/// Events emitted at stage and session boundaries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationEvent {
    StageStarted {
        session_id: Uuid,
        stage: StageName,
    },
    StageCompleted {
        session_id: Uuid,
        stage: StageName,
        status: StageStatus,
    },
    ExploitDiscovered {
        session_id: Uuid,
        summary: String,
    },
    SessionCompleted {
        session_id: Uuid,
    },
    SessionFailed {
        session_id: Uuid,
        error: String,
    },
}

/// Fire-and-forget sink. Implementations must not let delivery failures
/// escape.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: NotificationEvent);
}

/// Sink that logs events through tracing. Default for local runs.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, event: NotificationEvent) {
        match &event {
            NotificationEvent::ExploitDiscovered { session_id, summary } => {
                info!(session = %session_id, summary = %summary, "exploit discovered");
            }
            NotificationEvent::SessionFailed { session_id, error } => {
                warn!(session = %session_id, error = %error, "session failed");
            }
            other => debug!(event = ?other, "pipeline event"),
        }
    }
}

/// Sink that POSTs each event as JSON to a webhook endpoint
pub struct WebhookSink {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookSink {
    /// Delivery slower than this is treated as failed and dropped
    const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(endpoint: String) -> Self {
        Self::with_timeout(endpoint, Self::DELIVERY_TIMEOUT)
    }

    pub fn with_timeout(endpoint: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client, endpoint }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn notify(&self, event: NotificationEvent) {
        let result = self
            .client
            .post(&self.endpoint)
            .json(&event)
            .send()
            .await;

        match result {
            Ok(response) if !response.status().is_success() => {
                warn!(status = %response.status(), "webhook rejected notification");
            }
            Ok(_) => {}
            Err(e) => {
                // Fire-and-forget: log and move on
                warn!(error = %e, "webhook delivery failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize_with_tag() {
        let event = NotificationEvent::StageCompleted {
            session_id: Uuid::nil(),
            stage: StageName::Scan,
            status: StageStatus::Completed,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "stage_completed");
        assert_eq!(json["stage"], "scan");
        assert_eq!(json["status"], "completed");
    }

    #[tokio::test]
    async fn test_log_sink_never_fails() {
        let sink = LogSink;
        sink.notify(NotificationEvent::SessionCompleted { session_id: Uuid::nil() })
            .await;
    }

    #[tokio::test]
    async fn test_webhook_sink_gives_up_on_a_stalled_endpoint() {
        // Endpoint accepts the connection but never responds
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hold = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((sock, _)) = listener.accept().await {
                held.push(sock);
            }
        });

        let sink =
            WebhookSink::with_timeout(format!("http://{addr}/hook"), Duration::from_millis(100));
        tokio::time::timeout(
            Duration::from_secs(2),
            sink.notify(NotificationEvent::SessionCompleted { session_id: Uuid::nil() }),
        )
        .await
        .expect("notify must return once the delivery timeout elapses");
        hold.abort();
    }
}
