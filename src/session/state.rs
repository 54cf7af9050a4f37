use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Lifecycle status of the recording session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingStatus {
    #[default]
    Idle,
    Recording,
    Paused,
}

/// Snapshot of the recording state for API clients
///
/// `duration` is elapsed recording time in whole seconds, excluding all
/// paused intervals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingState {
    pub is_recording: bool,
    pub is_paused: bool,
    pub duration: u64,
}

/// Internal timing bookkeeping for the active recording
///
/// Monotonic timestamps only; wall-clock time is used solely for output
/// filenames and event timestamps.
#[derive(Debug, Default)]
pub(crate) struct Timing {
    pub(crate) status: RecordingStatus,
    pub(crate) recording_id: Option<Uuid>,
    pub(crate) output_path: Option<PathBuf>,
    pub(crate) started_at: Option<Instant>,
    pub(crate) paused_at: Option<Instant>,
    pub(crate) paused_total: Duration,
}

impl Timing {
    /// Elapsed recording time, excluding completed pause intervals.
    /// While paused, the pause timestamp is the effective endpoint, so a
    /// pause crossing a later stop contributes zero additional time.
    pub(crate) fn elapsed(&self, now: Instant) -> Duration {
        let Some(started) = self.started_at else {
            return Duration::ZERO;
        };
        let end = self.paused_at.unwrap_or(now);
        end.saturating_duration_since(started)
            .saturating_sub(self.paused_total)
    }

    pub(crate) fn snapshot(&self, now: Instant) -> RecordingState {
        RecordingState {
            is_recording: self.status != RecordingStatus::Idle,
            is_paused: self.status == RecordingStatus::Paused,
            duration: self.elapsed(now).as_secs(),
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Timing::default();
    }
}
