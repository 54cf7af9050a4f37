use crate::session::RecordingOptions;
use anyhow::Result;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure modes of a recorder backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("recording permission denied")]
    PermissionDenied,

    #[error("pause is not supported by this backend")]
    PauseUnsupported,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Audio recorder capability
///
/// Wraps whatever the host platform uses to capture encoded audio. The
/// session drives it through plain start/pause/resume/stop transitions; the
/// backend owns the capture resource from `start` until `stop` and finalizes
/// the output file on `stop`.
///
/// Implementations:
/// - Microphone: cpal input stream writing WAV (all desktop platforms)
/// - Test doubles in the integration tests
#[async_trait::async_trait]
pub trait RecorderBackend: Send {
    /// Prepare the capture resource and begin recording to `output`
    async fn start(
        &mut self,
        options: &RecordingOptions,
        output: &Path,
    ) -> Result<(), BackendError>;

    /// Pause capture; elapsed media time stops advancing
    async fn pause(&mut self) -> Result<(), BackendError>;

    /// Resume a paused capture
    async fn resume(&mut self) -> Result<(), BackendError>;

    /// Stop capture, finalize the file, and return its path
    async fn stop(&mut self) -> Result<PathBuf, BackendError>;

    /// Whether a capture is currently held (recording or paused)
    fn is_active(&self) -> bool;

    /// Whether this backend can pause without tearing down the capture
    fn supports_pause(&self) -> bool {
        true
    }

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Recorder backend factory
pub struct RecorderBackendFactory;

impl RecorderBackendFactory {
    /// Create a recorder backend by configured name
    pub fn create(name: &str) -> Result<Box<dyn RecorderBackend>> {
        match name {
            "microphone" | "mic" => Ok(Box::new(super::mic::MicBackend::new())),
            other => anyhow::bail!("Unknown recorder backend: {}", other),
        }
    }
}
