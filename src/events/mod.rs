//! State-change event delivery
//!
//! Every successful session transition produces one `RecordingStateChange`,
//! fanned out to the configured sinks: an in-process broadcast channel that
//! feeds the SSE endpoint, and optionally a NATS subject for external
//! consumers.

pub mod nats;

pub use nats::{NatsEventSink, RecordingStateMessage};

use crate::session::RecordingState;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Payload pushed on every successful recording transition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingStateChange {
    /// Id of the affected recording; absent once the session is idle again
    pub recording_id: Option<Uuid>,

    #[serde(flatten)]
    pub state: RecordingState,
}

/// Fire-and-forget channel for state-change notifications
#[async_trait::async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: &RecordingStateChange) -> Result<()>;

    /// Sink name for logging
    fn name(&self) -> &str;
}

/// In-process sink backed by a tokio broadcast channel
pub struct BroadcastEventSink {
    tx: broadcast::Sender<RecordingStateChange>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RecordingStateChange> {
        self.tx.subscribe()
    }
}

#[async_trait::async_trait]
impl EventSink for BroadcastEventSink {
    async fn emit(&self, event: &RecordingStateChange) -> Result<()> {
        // No subscribers is not an error; events are fire-and-forget
        let _ = self.tx.send(event.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "broadcast"
    }
}
