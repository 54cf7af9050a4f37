use super::error::RecordingError;
use super::options::RecordingOptions;
use super::state::{RecordingState, RecordingStatus, Timing};
use crate::device::RecorderBackend;
use crate::events::{EventSink, RecordingStateChange};
use crate::guard::ExecutionGuard;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};
use uuid::Uuid;

/// The recording lifecycle state machine
///
/// Owns at most one active recording at a time. Actual audio capture is
/// delegated to the injected [`RecorderBackend`]; the background execution
/// guard is held for the whole recording+paused span and released on stop,
/// including forced cleanup. Every successful transition emits exactly one
/// state-change event through the configured sinks; failed calls never emit.
///
/// Operations are serialized: the backend lock is taken without waiting, so
/// a call arriving while another is in flight fails fast with
/// [`RecordingError::OperationInProgress`]. The one exception is `start`,
/// where a single pending call may wait for the in-flight operation to
/// finish (the startup handshake race); further concurrent starts fail fast.
/// Clears the pending-start slot on drop, so a queued caller that goes
/// away while waiting for the backend lock cannot wedge the slot shut
struct PendingSlot<'a>(&'a AtomicBool);

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct RecordingSession {
    /// Serializes all transitions, including the blocking device call
    backend: Mutex<Box<dyn RecorderBackend>>,

    /// Set while one start call is queued behind an in-flight operation
    start_pending: AtomicBool,

    /// Timing snapshot readable without contending on the backend lock
    timing: StdMutex<Timing>,

    guard: Arc<dyn ExecutionGuard>,
    sinks: Vec<Arc<dyn EventSink>>,
    output_dir: PathBuf,
}

impl RecordingSession {
    /// Create an idle session writing finished recordings under `output_dir`
    pub fn new(
        backend: Box<dyn RecorderBackend>,
        guard: Arc<dyn ExecutionGuard>,
        sinks: Vec<Arc<dyn EventSink>>,
        output_dir: PathBuf,
    ) -> Result<Self> {
        std::fs::create_dir_all(&output_dir).with_context(|| {
            format!(
                "Failed to create output directory {}",
                output_dir.display()
            )
        })?;

        Ok(Self {
            backend: Mutex::new(backend),
            start_pending: AtomicBool::new(false),
            timing: StdMutex::new(Timing::default()),
            guard,
            sinks,
            output_dir,
        })
    }

    /// Start a new recording
    ///
    /// Acquires the execution guard, starts the device, and transitions to
    /// RECORDING. On any failure the guard is released and the session stays
    /// IDLE. Returns the id assigned to this recording.
    pub async fn start(&self, options: RecordingOptions) -> Result<Uuid, RecordingError> {
        let mut backend = match self.backend.try_lock() {
            Ok(backend) => backend,
            Err(_) => {
                // At most one start may queue behind an in-flight operation
                if self
                    .start_pending
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    let slot = PendingSlot(&self.start_pending);
                    let backend = self.backend.lock().await;
                    drop(slot);
                    backend
                } else {
                    return Err(RecordingError::OperationInProgress);
                }
            }
        };

        if self.status() != RecordingStatus::Idle {
            return Err(RecordingError::AlreadyRecording);
        }

        options.validate().map_err(RecordingError::InvalidOptions)?;

        self.guard.acquire().await.map_err(RecordingError::Device)?;

        let recording_id = Uuid::new_v4();
        let output_path = self.output_path_for(&options);

        if let Err(e) = backend.start(&options, &output_path).await {
            // A failed start never held valid resources
            self.guard.release().await;
            return Err(e.into());
        }

        {
            let mut timing = self.timing.lock().expect("timing mutex poisoned");
            timing.status = RecordingStatus::Recording;
            timing.recording_id = Some(recording_id);
            timing.output_path = Some(output_path.clone());
            timing.started_at = Some(Instant::now());
            timing.paused_at = None;
            timing.paused_total = Duration::ZERO;
        }

        self.emit_state().await;

        info!(
            "Recording {} started via {} backend: {}",
            recording_id,
            backend.name(),
            output_path.display()
        );

        Ok(recording_id)
    }

    /// Pause the active recording
    ///
    /// On device failure the session stays RECORDING; the device is assumed
    /// still valid.
    pub async fn pause(&self) -> Result<(), RecordingError> {
        let mut backend = self.try_backend()?;

        match self.status() {
            RecordingStatus::Idle => return Err(RecordingError::NotRecording),
            RecordingStatus::Paused => return Err(RecordingError::AlreadyPaused),
            RecordingStatus::Recording => {}
        }

        if !backend.supports_pause() {
            return Err(RecordingError::UnsupportedOnPlatform);
        }

        backend.pause().await?;

        {
            let mut timing = self.timing.lock().expect("timing mutex poisoned");
            timing.status = RecordingStatus::Paused;
            timing.paused_at = Some(Instant::now());
        }

        self.emit_state().await;
        info!("Recording paused");

        Ok(())
    }

    /// Resume a paused recording
    ///
    /// On device failure the session stays PAUSED.
    pub async fn resume(&self) -> Result<(), RecordingError> {
        let mut backend = self.try_backend()?;

        match self.status() {
            RecordingStatus::Idle => return Err(RecordingError::NotRecording),
            RecordingStatus::Recording => return Err(RecordingError::NotPaused),
            RecordingStatus::Paused => {}
        }

        backend.resume().await?;

        {
            let mut timing = self.timing.lock().expect("timing mutex poisoned");
            if let Some(paused_at) = timing.paused_at.take() {
                timing.paused_total += paused_at.elapsed();
            }
            timing.status = RecordingStatus::Recording;
        }

        self.emit_state().await;
        info!("Recording resumed");

        Ok(())
    }

    /// Stop the active recording and return the finished file path
    ///
    /// Legal from both RECORDING and PAUSED. On device failure the session
    /// is force-cleaned back to IDLE (guard released, state cleared) so it
    /// never wedges referencing a dead device.
    pub async fn stop(&self) -> Result<PathBuf, RecordingError> {
        let mut backend = self.try_backend()?;

        if self.status() == RecordingStatus::Idle {
            return Err(RecordingError::NotRecording);
        }

        let elapsed = self.elapsed();

        match backend.stop().await {
            Ok(path) => {
                self.guard.release().await;
                self.timing.lock().expect("timing mutex poisoned").reset();
                self.emit_state().await;
                info!(
                    "Recording stopped after {:.1}s: {}",
                    elapsed.as_secs_f64(),
                    path.display()
                );
                Ok(path)
            }
            Err(e) => {
                warn!("Device failed to stop, forcing session cleanup: {}", e);
                self.guard.release().await;
                self.timing.lock().expect("timing mutex poisoned").reset();
                Err(e.into())
            }
        }
    }

    /// Current state snapshot; never fails, reports IDLE with zero duration
    /// when nothing is recording
    pub fn state(&self) -> RecordingState {
        self.timing
            .lock()
            .expect("timing mutex poisoned")
            .snapshot(Instant::now())
    }

    /// Full-precision elapsed recording time, excluding paused intervals
    pub fn elapsed(&self) -> Duration {
        self.timing
            .lock()
            .expect("timing mutex poisoned")
            .elapsed(Instant::now())
    }

    /// Output path of the active recording; `None` while idle
    pub fn output_path(&self) -> Option<PathBuf> {
        self.timing
            .lock()
            .expect("timing mutex poisoned")
            .output_path
            .clone()
    }

    /// Where finished recordings are written
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn status(&self) -> RecordingStatus {
        self.timing.lock().expect("timing mutex poisoned").status
    }

    fn try_backend(&self) -> Result<MutexGuard<'_, Box<dyn RecorderBackend>>, RecordingError> {
        self.backend
            .try_lock()
            .map_err(|_| RecordingError::OperationInProgress)
    }

    fn output_path_for(&self, options: &RecordingOptions) -> PathBuf {
        let filename = format!(
            "recording_{}.{}",
            Utc::now().format("%Y%m%d-%H%M%S%.3f"),
            options.container_format.extension()
        );
        self.output_dir.join(filename)
    }

    async fn emit_state(&self) {
        let (recording_id, state) = {
            let timing = self.timing.lock().expect("timing mutex poisoned");
            (timing.recording_id, timing.snapshot(Instant::now()))
        };

        let event = RecordingStateChange {
            recording_id,
            state,
        };

        for sink in &self.sinks {
            if let Err(e) = sink.emit(&event).await {
                warn!(
                    "Failed to deliver state event via {} sink: {:#}",
                    sink.name(),
                    e
                );
            }
        }
    }
}
