// Integration tests for the recording lifecycle state machine
//
// These drive RecordingSession through every transition with mock
// capability implementations and verify state, timing, guard pairing,
// and event emission.

use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tapedeck::{
    BackendError, ContainerFormat, EventSink, ExecutionGuard, RecorderBackend, RecordingError,
    RecordingOptions, RecordingSession, RecordingStateChange,
};
use tempfile::TempDir;
use tokio::time::sleep;

#[derive(Default)]
struct MockDeviceState {
    started: AtomicUsize,
    paused: AtomicUsize,
    resumed: AtomicUsize,
    stopped: AtomicUsize,
    fail_start: AtomicBool,
    fail_pause: AtomicBool,
    fail_stop: AtomicBool,
    start_delay_ms: AtomicU64,
    active: AtomicBool,
}

struct MockBackend {
    state: Arc<MockDeviceState>,
    supports_pause: bool,
    output: Mutex<Option<PathBuf>>,
}

impl MockBackend {
    fn new(state: Arc<MockDeviceState>) -> Self {
        Self {
            state,
            supports_pause: true,
            output: Mutex::new(None),
        }
    }

    fn without_pause(state: Arc<MockDeviceState>) -> Self {
        Self {
            supports_pause: false,
            ..Self::new(state)
        }
    }
}

#[async_trait::async_trait]
impl RecorderBackend for MockBackend {
    async fn start(
        &mut self,
        _options: &RecordingOptions,
        output: &std::path::Path,
    ) -> Result<(), BackendError> {
        let delay = self.state.start_delay_ms.load(Ordering::Relaxed);
        if delay > 0 {
            sleep(Duration::from_millis(delay)).await;
        }
        if self.state.fail_start.load(Ordering::Relaxed) {
            return Err(BackendError::Other(anyhow!("device refused to start")));
        }
        self.state.started.fetch_add(1, Ordering::Relaxed);
        self.state.active.store(true, Ordering::Relaxed);
        *self.output.lock().unwrap() = Some(output.to_path_buf());
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), BackendError> {
        if self.state.fail_pause.load(Ordering::Relaxed) {
            return Err(BackendError::Other(anyhow!("device refused to pause")));
        }
        self.state.paused.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn resume(&mut self) -> Result<(), BackendError> {
        self.state.resumed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn stop(&mut self) -> Result<PathBuf, BackendError> {
        self.state.active.store(false, Ordering::Relaxed);
        let path = self.output.lock().unwrap().take();
        if self.state.fail_stop.load(Ordering::Relaxed) {
            return Err(BackendError::Other(anyhow!("device refused to stop")));
        }
        self.state.stopped.fetch_add(1, Ordering::Relaxed);
        path.ok_or_else(|| BackendError::Other(anyhow!("no capture in progress")))
    }

    fn is_active(&self) -> bool {
        self.state.active.load(Ordering::Relaxed)
    }

    fn supports_pause(&self) -> bool {
        self.supports_pause
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[derive(Default)]
struct CountingGuard {
    acquired: AtomicUsize,
    released: AtomicUsize,
}

#[async_trait::async_trait]
impl ExecutionGuard for CountingGuard {
    async fn acquire(&self) -> Result<()> {
        self.acquired.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn release(&self) {
        self.released.fetch_add(1, Ordering::Relaxed);
    }

    fn name(&self) -> &str {
        "counting"
    }
}

#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<RecordingStateChange>>,
}

impl CollectingSink {
    fn events(&self) -> Vec<RecordingStateChange> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl EventSink for CollectingSink {
    async fn emit(&self, event: &RecordingStateChange) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "collecting"
    }
}

struct Fixture {
    session: Arc<RecordingSession>,
    device: Arc<MockDeviceState>,
    guard: Arc<CountingGuard>,
    sink: Arc<CollectingSink>,
    _dir: TempDir,
}

fn fixture() -> Fixture {
    fixture_with(|state| Box::new(MockBackend::new(state)))
}

fn fixture_with(
    make_backend: impl FnOnce(Arc<MockDeviceState>) -> Box<dyn RecorderBackend>,
) -> Fixture {
    let dir = TempDir::new().expect("temp dir");
    let device = Arc::new(MockDeviceState::default());
    let guard = Arc::new(CountingGuard::default());
    let sink = Arc::new(CollectingSink::default());

    let session = RecordingSession::new(
        make_backend(Arc::clone(&device)),
        guard.clone(),
        vec![sink.clone()],
        dir.path().join("recordings"),
    )
    .expect("session");

    Fixture {
        session: Arc::new(session),
        device,
        guard,
        sink,
        _dir: dir,
    }
}

#[tokio::test]
async fn fresh_session_is_idle() {
    let f = fixture();
    let state = f.session.state();

    assert!(!state.is_recording);
    assert!(!state.is_paused);
    assert_eq!(state.duration, 0);
    assert!(f.session.output_path().is_none());
}

#[tokio::test]
async fn start_transitions_to_recording() {
    let f = fixture();
    f.session.start(RecordingOptions::default()).await.unwrap();

    let state = f.session.state();
    assert!(state.is_recording);
    assert!(!state.is_paused);
    assert_eq!(f.device.started.load(Ordering::Relaxed), 1);
    assert_eq!(f.guard.acquired.load(Ordering::Relaxed), 1);
    assert!(f.session.output_path().is_some());
}

#[tokio::test]
async fn start_while_recording_fails_already_recording() {
    let f = fixture();
    f.session.start(RecordingOptions::default()).await.unwrap();

    let err = f.session.start(RecordingOptions::default()).await.unwrap_err();
    assert!(matches!(err, RecordingError::AlreadyRecording));

    // State unchanged, device untouched by the failed call
    assert!(f.session.state().is_recording);
    assert_eq!(f.device.started.load(Ordering::Relaxed), 1);
    assert_eq!(f.guard.acquired.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn pause_on_idle_fails_not_recording() {
    let f = fixture();
    let err = f.session.pause().await.unwrap_err();
    assert!(matches!(err, RecordingError::NotRecording));
    assert_eq!(f.device.paused.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn resume_on_idle_fails_not_recording() {
    let f = fixture();
    let err = f.session.resume().await.unwrap_err();
    assert!(matches!(err, RecordingError::NotRecording));
}

#[tokio::test]
async fn stop_on_idle_fails_not_recording() {
    let f = fixture();
    let err = f.session.stop().await.unwrap_err();
    assert!(matches!(err, RecordingError::NotRecording));
}

#[tokio::test]
async fn pause_twice_fails_already_paused() {
    let f = fixture();
    f.session.start(RecordingOptions::default()).await.unwrap();
    f.session.pause().await.unwrap();

    let err = f.session.pause().await.unwrap_err();
    assert!(matches!(err, RecordingError::AlreadyPaused));
    assert_eq!(f.device.paused.load(Ordering::Relaxed), 1);
    assert!(f.session.state().is_paused);
}

#[tokio::test]
async fn resume_while_recording_fails_not_paused() {
    let f = fixture();
    f.session.start(RecordingOptions::default()).await.unwrap();

    let err = f.session.resume().await.unwrap_err();
    assert!(matches!(err, RecordingError::NotPaused));
    assert_eq!(f.device.resumed.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn elapsed_excludes_paused_interval() {
    let f = fixture();
    f.session.start(RecordingOptions::default()).await.unwrap();

    sleep(Duration::from_millis(200)).await;
    f.session.pause().await.unwrap();

    let at_pause = f.session.elapsed();
    assert!(at_pause >= Duration::from_millis(150), "got {:?}", at_pause);
    assert!(at_pause < Duration::from_millis(600), "got {:?}", at_pause);

    // Frozen while paused
    sleep(Duration::from_millis(200)).await;
    assert_eq!(f.session.elapsed(), at_pause);

    f.session.resume().await.unwrap();
    sleep(Duration::from_millis(200)).await;

    let total = f.session.elapsed();
    assert!(total >= at_pause + Duration::from_millis(150), "got {:?}", total);
    assert!(total < at_pause + Duration::from_millis(600), "got {:?}", total);

    f.session.stop().await.unwrap();
    assert_eq!(f.session.elapsed(), Duration::ZERO);
}

#[tokio::test]
async fn elapsed_is_non_decreasing_while_recording() {
    let f = fixture();
    f.session.start(RecordingOptions::default()).await.unwrap();

    let mut last = f.session.elapsed();
    for _ in 0..5 {
        sleep(Duration::from_millis(20)).await;
        let now = f.session.elapsed();
        assert!(now >= last);
        assert!(f.session.state().is_recording);
        last = now;
    }
}

#[tokio::test]
async fn stop_while_paused_is_legal() {
    let f = fixture();
    f.session.start(RecordingOptions::default()).await.unwrap();
    sleep(Duration::from_millis(100)).await;
    f.session.pause().await.unwrap();
    sleep(Duration::from_millis(100)).await;

    let path = f.session.stop().await.unwrap();
    assert!(path.to_string_lossy().ends_with(".m4a"));

    let state = f.session.state();
    assert!(!state.is_recording);
    assert!(!state.is_paused);
    assert_eq!(state.duration, 0);
    assert_eq!(f.guard.released.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn output_path_uses_container_extension() {
    for (container, ext) in [
        (ContainerFormat::M4a, ".m4a"),
        (ContainerFormat::Aac, ".aac"),
        (ContainerFormat::ThreeGp, ".3gp"),
    ] {
        let f = fixture();
        let options = RecordingOptions {
            container_format: container,
            ..Default::default()
        };
        f.session.start(options).await.unwrap();
        let path = f.session.stop().await.unwrap();
        assert!(
            path.to_string_lossy().ends_with(ext),
            "expected {} suffix, got {}",
            ext,
            path.display()
        );
    }
}

#[tokio::test]
async fn invalid_channel_count_is_rejected() {
    let f = fixture();
    let options = RecordingOptions {
        channel_count: 4,
        ..Default::default()
    };

    let err = f.session.start(options).await.unwrap_err();
    assert!(matches!(err, RecordingError::InvalidOptions(_)));
    assert_eq!(err.code(), "INVALID_OPTIONS");

    // Rejected before the guard or device were touched
    assert!(!f.session.state().is_recording);
    assert_eq!(f.device.started.load(Ordering::Relaxed), 0);
    assert_eq!(f.guard.acquired.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn failed_start_releases_guard_and_stays_idle() {
    let f = fixture();
    f.device.fail_start.store(true, Ordering::Relaxed);

    let err = f.session.start(RecordingOptions::default()).await.unwrap_err();
    assert!(matches!(err, RecordingError::Device(_)));

    assert!(!f.session.state().is_recording);
    assert_eq!(f.guard.acquired.load(Ordering::Relaxed), 1);
    assert_eq!(f.guard.released.load(Ordering::Relaxed), 1);
    assert!(f.sink.events().is_empty());

    // Recoverable: the next start succeeds
    f.device.fail_start.store(false, Ordering::Relaxed);
    f.session.start(RecordingOptions::default()).await.unwrap();
    assert!(f.session.state().is_recording);
}

#[tokio::test]
async fn failed_stop_forces_cleanup() {
    let f = fixture();
    f.session.start(RecordingOptions::default()).await.unwrap();
    f.device.fail_stop.store(true, Ordering::Relaxed);

    let err = f.session.stop().await.unwrap_err();
    assert!(matches!(err, RecordingError::Device(_)));

    // Forced back to idle, guard released, nothing leaked
    let state = f.session.state();
    assert!(!state.is_recording);
    assert!(!state.is_paused);
    assert!(f.session.output_path().is_none());
    assert_eq!(f.guard.acquired.load(Ordering::Relaxed), 1);
    assert_eq!(f.guard.released.load(Ordering::Relaxed), 1);

    // A subsequent start succeeds
    f.device.fail_stop.store(false, Ordering::Relaxed);
    f.session.start(RecordingOptions::default()).await.unwrap();
    assert!(f.session.state().is_recording);
    assert_eq!(f.guard.acquired.load(Ordering::Relaxed), 2);
}

#[tokio::test]
async fn failed_pause_leaves_session_recording() {
    let f = fixture();
    f.session.start(RecordingOptions::default()).await.unwrap();
    f.device.fail_pause.store(true, Ordering::Relaxed);

    let err = f.session.pause().await.unwrap_err();
    assert!(matches!(err, RecordingError::Device(_)));

    let state = f.session.state();
    assert!(state.is_recording);
    assert!(!state.is_paused);

    // Still pausable once the device recovers
    f.device.fail_pause.store(false, Ordering::Relaxed);
    f.session.pause().await.unwrap();
    assert!(f.session.state().is_paused);
}

#[tokio::test]
async fn pause_without_capability_fails_unsupported() {
    let f = fixture_with(|state| Box::new(MockBackend::without_pause(state)));
    f.session.start(RecordingOptions::default()).await.unwrap();

    let err = f.session.pause().await.unwrap_err();
    assert!(matches!(err, RecordingError::UnsupportedOnPlatform));
    assert_eq!(f.device.paused.load(Ordering::Relaxed), 0);
    assert!(f.session.state().is_recording);
}

#[tokio::test]
async fn every_successful_transition_emits_one_event() {
    let f = fixture();

    f.session.start(RecordingOptions::default()).await.unwrap();
    f.session.pause().await.unwrap();
    f.session.resume().await.unwrap();
    f.session.stop().await.unwrap();

    let events = f.sink.events();
    assert_eq!(events.len(), 4);

    assert!(events[0].state.is_recording && !events[0].state.is_paused);
    assert!(events[1].state.is_recording && events[1].state.is_paused);
    assert!(events[2].state.is_recording && !events[2].state.is_paused);
    assert!(!events[3].state.is_recording && !events[3].state.is_paused);
    assert_eq!(events[3].state.duration, 0);

    assert!(events[0].recording_id.is_some());
    assert_eq!(events[0].recording_id, events[1].recording_id);
}

#[tokio::test]
async fn failed_calls_never_emit() {
    let f = fixture();

    let _ = f.session.pause().await.unwrap_err();
    let _ = f.session.stop().await.unwrap_err();
    assert!(f.sink.events().is_empty());

    f.session.start(RecordingOptions::default()).await.unwrap();
    let _ = f.session.start(RecordingOptions::default()).await.unwrap_err();
    let _ = f.session.resume().await.unwrap_err();
    assert_eq!(f.sink.events().len(), 1);
}

#[tokio::test]
async fn concurrent_calls_fail_fast_with_one_queued_start() {
    let f = fixture();
    f.device.start_delay_ms.store(300, Ordering::Relaxed);

    let first = {
        let session = Arc::clone(&f.session);
        tokio::spawn(async move { session.start(RecordingOptions::default()).await })
    };
    sleep(Duration::from_millis(50)).await;

    // Non-start operations fail fast while start is in flight
    let err = f.session.pause().await.unwrap_err();
    assert!(matches!(err, RecordingError::OperationInProgress));

    // One start may queue behind the in-flight call...
    let second = {
        let session = Arc::clone(&f.session);
        tokio::spawn(async move { session.start(RecordingOptions::default()).await })
    };
    sleep(Duration::from_millis(50)).await;

    // ...but a third concurrent start fails fast
    let err = f.session.start(RecordingOptions::default()).await.unwrap_err();
    assert!(matches!(err, RecordingError::OperationInProgress));

    // Exactly one of the racing starts wins
    first.await.unwrap().expect("first start should succeed");
    let err = second.await.unwrap().unwrap_err();
    assert!(matches!(err, RecordingError::AlreadyRecording));

    assert_eq!(f.device.started.load(Ordering::Relaxed), 1);
    assert_eq!(f.guard.acquired.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn aborted_queued_start_frees_the_pending_slot() {
    let f = fixture();
    f.device.start_delay_ms.store(300, Ordering::Relaxed);

    let first = {
        let session = Arc::clone(&f.session);
        tokio::spawn(async move { session.start(RecordingOptions::default()).await })
    };
    sleep(Duration::from_millis(50)).await;

    // Queue a second start, then drop it while it waits for the lock
    let second = {
        let session = Arc::clone(&f.session);
        tokio::spawn(async move { session.start(RecordingOptions::default()).await })
    };
    sleep(Duration::from_millis(50)).await;
    second.abort();
    let _ = second.await;

    // The slot is free again: a later contended start queues and reports
    // the recording the first call established, not OperationInProgress
    let err = f.session.start(RecordingOptions::default()).await.unwrap_err();
    assert!(matches!(err, RecordingError::AlreadyRecording));

    first.await.unwrap().expect("first start should succeed");
    assert_eq!(f.device.started.load(Ordering::Relaxed), 1);
    assert_eq!(f.guard.acquired.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn state_query_is_idempotent() {
    let f = fixture();
    f.session.start(RecordingOptions::default()).await.unwrap();

    let a = f.session.state();
    let b = f.session.state();
    assert_eq!(a.is_recording, b.is_recording);
    assert_eq!(a.is_paused, b.is_paused);
    assert!(b.duration >= a.duration);
}

#[tokio::test]
async fn restart_resets_pause_accounting() {
    let f = fixture();

    f.session.start(RecordingOptions::default()).await.unwrap();
    sleep(Duration::from_millis(100)).await;
    f.session.pause().await.unwrap();
    sleep(Duration::from_millis(150)).await;
    f.session.stop().await.unwrap();

    // Second recording starts from a clean slate
    f.session.start(RecordingOptions::default()).await.unwrap();
    let fresh = f.session.elapsed();
    assert!(fresh < Duration::from_millis(100), "got {:?}", fresh);

    f.session.stop().await.unwrap();
    assert_eq!(f.guard.acquired.load(Ordering::Relaxed), 2);
    assert_eq!(f.guard.released.load(Ordering::Relaxed), 2);
}
