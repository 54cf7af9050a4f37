use super::{EventSink, RecordingStateChange};
use anyhow::{Context, Result};
use async_nats::Client;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Recording state message published to NATS
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordingStateMessage {
    pub recording_id: Option<Uuid>,
    pub is_recording: bool,
    pub is_paused: bool,
    pub duration_secs: u64,
    /// RFC3339 timestamp
    pub timestamp: String,
}

/// Event sink publishing state changes to a NATS subject
pub struct NatsEventSink {
    client: Client,
    subject: String,
}

impl NatsEventSink {
    /// Connect to NATS and publish under `<service_name>.recording.state`
    pub async fn connect(url: &str, service_name: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        let subject = format!("{}.recording.state", service_name);
        info!("Connected to NATS, publishing state to {}", subject);

        Ok(Self { client, subject })
    }
}

#[async_trait::async_trait]
impl EventSink for NatsEventSink {
    async fn emit(&self, event: &RecordingStateChange) -> Result<()> {
        let message = RecordingStateMessage {
            recording_id: event.recording_id,
            is_recording: event.state.is_recording,
            is_paused: event.state.is_paused,
            duration_secs: event.state.duration,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await
            .context("Failed to publish recording state")?;

        Ok(())
    }

    fn name(&self) -> &str {
        "nats"
    }
}
