//! Frame event publication to the output stream.

use tracing::debug;

use vframe_models::SegmentEvent;

use crate::error::QueueResult;

/// Default output stream for frame events.
const DEFAULT_EVENTS_STREAM: &str = "vframe:frames";

/// Channel for publishing frame events consumed downstream.
pub struct FrameEventChannel {
    client: redis::Client,
    stream: String,
}

impl FrameEventChannel {
    /// Create a new event channel.
    pub fn new(redis_url: &str, stream: impl Into<String>) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            stream: stream.into(),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let stream = std::env::var("FRAME_EVENTS_STREAM")
            .unwrap_or_else(|_| DEFAULT_EVENTS_STREAM.to_string());
        Self::new(&redis_url, stream)
    }

    /// Publish an event; returns the stream entry id.
    pub async fn publish(&self, event: &SegmentEvent) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(event)?;

        debug!("Publishing event to {}", self.stream);
        let entry_id: String = redis::cmd("XADD")
            .arg(&self.stream)
            .arg("*")
            .arg("event")
            .arg(&payload)
            .query_async(&mut conn)
            .await?;

        Ok(entry_id)
    }

    /// Stream this channel publishes to.
    pub fn stream(&self) -> &str {
        &self.stream
    }
}
