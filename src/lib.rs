pub mod config;
pub mod device;
pub mod events;
pub mod guard;
pub mod http;
pub mod session;

pub use config::Config;
pub use device::{BackendError, MicBackend, RecordedFile, RecorderBackend, RecorderBackendFactory};
pub use events::{BroadcastEventSink, EventSink, NatsEventSink, RecordingStateChange};
pub use guard::{ExecutionGuard, NullExecutionGuard};
pub use http::{create_router, AppState};
pub use session::{
    ContainerFormat, RecordingError, RecordingOptions, RecordingSession, RecordingState,
    RecordingStatus,
};
