use crate::events::BroadcastEventSink;
use crate::session::{RecordingOptions, RecordingSession};
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The single recording session owned by this process
    pub session: Arc<RecordingSession>,

    /// Broadcast sink feeding the SSE event stream
    pub events: Arc<BroadcastEventSink>,

    /// Service-level recording defaults, used when a start request carries
    /// no options
    pub defaults: RecordingOptions,
}

impl AppState {
    pub fn new(
        session: Arc<RecordingSession>,
        events: Arc<BroadcastEventSink>,
        defaults: RecordingOptions,
    ) -> Self {
        Self {
            session,
            events,
            defaults,
        }
    }
}
