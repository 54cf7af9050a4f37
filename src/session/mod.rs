//! Recording lifecycle management
//!
//! This module provides the `RecordingSession` state machine that manages:
//! - The idle → recording → paused → recording → stopped lifecycle
//! - Elapsed-time accounting that excludes paused intervals
//! - Execution-guard pairing for background keepalive
//! - State-change event emission
//! - Serialization of concurrent control calls

mod error;
mod options;
mod session;
mod state;

pub use error::RecordingError;
pub use options::{ContainerFormat, RecordingOptions};
pub use session::RecordingSession;
pub use state::{RecordingState, RecordingStatus};
