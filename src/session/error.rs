use crate::device::BackendError;
use thiserror::Error;

/// Failures surfaced by recording session operations
///
/// Every variant carries a stable code for API clients; messages are
/// human-readable and may change.
#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("no recording is in progress")]
    NotRecording,

    #[error("recording is already paused")]
    AlreadyPaused,

    #[error("recording is not paused")]
    NotPaused,

    #[error("recording permission denied")]
    PermissionDenied,

    #[error("pause/resume is not supported by this recorder")]
    UnsupportedOnPlatform,

    #[error("invalid recording options: {0}")]
    InvalidOptions(anyhow::Error),

    #[error("recorder device error: {0}")]
    Device(anyhow::Error),

    #[error("another recording operation is in progress")]
    OperationInProgress,
}

impl RecordingError {
    /// Stable machine-readable code for this failure
    pub fn code(&self) -> &'static str {
        match self {
            RecordingError::AlreadyRecording => "ALREADY_RECORDING",
            RecordingError::NotRecording => "NOT_RECORDING",
            RecordingError::AlreadyPaused => "ALREADY_PAUSED",
            RecordingError::NotPaused => "NOT_PAUSED",
            RecordingError::PermissionDenied => "PERMISSION_DENIED",
            RecordingError::UnsupportedOnPlatform => "UNSUPPORTED_ON_PLATFORM",
            RecordingError::InvalidOptions(_) => "INVALID_OPTIONS",
            RecordingError::Device(_) => "DEVICE_ERROR",
            RecordingError::OperationInProgress => "OPERATION_IN_PROGRESS",
        }
    }
}

impl From<BackendError> for RecordingError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::PermissionDenied => RecordingError::PermissionDenied,
            BackendError::PauseUnsupported => RecordingError::UnsupportedOnPlatform,
            BackendError::Other(e) => RecordingError::Device(e),
        }
    }
}
