use super::backend::{BackendError, RecorderBackend};
use crate::session::{ContainerFormat, RecordingOptions};
use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, StreamConfig};
use hound::{WavSpec, WavWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Commands sent to the capture thread
///
/// Pause and resume carry an ack channel; the thread answers only after the
/// callback gate has been flipped, so the reported transition matches what
/// the input callback sees.
enum Command {
    Pause(oneshot::Sender<()>),
    Resume(oneshot::Sender<()>),
    Stop,
}

/// Handle to a running capture thread
struct Capture {
    cmd_tx: mpsc::Sender<Command>,
    done_rx: oneshot::Receiver<Result<u64>>,
    thread: std::thread::JoinHandle<()>,
    active: Arc<AtomicBool>,
    output: PathBuf,
}

/// Microphone recorder backend
///
/// Captures from the default input device via cpal and writes 16-bit PCM
/// WAV. cpal streams are not `Send`, so the stream lives on a dedicated
/// thread driven by a command channel; pausing gates the input callback, so
/// paused wall time contributes no samples to the file.
///
/// This is the development/desktop capture path: it writes WAV payloads
/// whatever container extension was requested. Hosts with hardware encoders
/// supply their own backend for real AAC output.
pub struct MicBackend {
    capture: Option<Capture>,
}

impl MicBackend {
    pub fn new() -> Self {
        Self { capture: None }
    }
}

impl Default for MicBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RecorderBackend for MicBackend {
    async fn start(
        &mut self,
        options: &RecordingOptions,
        output: &Path,
    ) -> Result<(), BackendError> {
        if self.capture.is_some() {
            return Err(anyhow!("Capture thread already running").into());
        }

        if options.container_format != ContainerFormat::M4a {
            warn!(
                "Microphone backend writes PCM WAV data into the requested .{} container",
                options.container_format.extension()
            );
        }

        let (ready_tx, ready_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let active = Arc::new(AtomicBool::new(true));

        let opts = options.clone();
        let path = output.to_path_buf();
        let thread_active = Arc::clone(&active);

        let thread = std::thread::spawn(move || {
            run_capture(opts, path, cmd_rx, ready_tx, done_tx, thread_active);
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                self.capture = Some(Capture {
                    cmd_tx,
                    done_rx,
                    thread,
                    active,
                    output: output.to_path_buf(),
                });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(BackendError::Other(e))
            }
            Err(_) => {
                let _ = thread.join();
                Err(anyhow!("Capture thread exited before becoming ready").into())
            }
        }
    }

    async fn pause(&mut self) -> Result<(), BackendError> {
        let capture = self
            .capture
            .as_ref()
            .ok_or_else(|| anyhow!("No capture running"))?;
        let (ack_tx, ack_rx) = oneshot::channel();
        capture
            .cmd_tx
            .send(Command::Pause(ack_tx))
            .map_err(|_| anyhow!("Capture thread is gone"))?;
        ack_rx
            .await
            .map_err(|_| anyhow!("Capture thread died before acknowledging pause"))?;
        Ok(())
    }

    async fn resume(&mut self) -> Result<(), BackendError> {
        let capture = self
            .capture
            .as_ref()
            .ok_or_else(|| anyhow!("No capture running"))?;
        let (ack_tx, ack_rx) = oneshot::channel();
        capture
            .cmd_tx
            .send(Command::Resume(ack_tx))
            .map_err(|_| anyhow!("Capture thread is gone"))?;
        ack_rx
            .await
            .map_err(|_| anyhow!("Capture thread died before acknowledging resume"))?;
        Ok(())
    }

    async fn stop(&mut self) -> Result<PathBuf, BackendError> {
        let capture = self
            .capture
            .take()
            .ok_or_else(|| anyhow!("No capture running"))?;

        // The thread finalizes the writer before answering, so the join
        // below returns immediately.
        let _ = capture.cmd_tx.send(Command::Stop);

        let samples = capture
            .done_rx
            .await
            .map_err(|_| anyhow!("Capture thread died before finalizing"))?
            .context("Failed to finalize recording")?;

        if capture.thread.join().is_err() {
            warn!("Capture thread panicked after finalizing");
        }

        info!(
            "Microphone capture finished: {} samples written to {}",
            samples,
            capture.output.display()
        );

        Ok(capture.output)
    }

    fn is_active(&self) -> bool {
        self.capture
            .as_ref()
            .map(|c| c.active.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

/// Body of the capture thread: owns the cpal stream and the WAV writer
fn run_capture(
    options: RecordingOptions,
    output: PathBuf,
    cmd_rx: mpsc::Receiver<Command>,
    ready_tx: oneshot::Sender<Result<()>>,
    done_tx: oneshot::Sender<Result<u64>>,
    active: Arc<AtomicBool>,
) {
    let host = cpal::default_host();
    let device = match host.default_input_device() {
        Some(device) => device,
        None => {
            let _ = ready_tx.send(Err(anyhow!("No default input device found")));
            return;
        }
    };

    let config = match input_config_for(&device, options.sample_rate_hz, options.channel_count) {
        Ok(config) => config,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    let spec = WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate.0,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let writer = match WavWriter::create(&output, spec) {
        Ok(writer) => Arc::new(Mutex::new(Some(writer))),
        Err(e) => {
            let _ = ready_tx.send(Err(
                anyhow::Error::new(e).context(format!("Failed to create {}", output.display()))
            ));
            return;
        }
    };

    let gate = Arc::new(AtomicBool::new(true));
    let written = Arc::new(AtomicU64::new(0));

    let cb_writer = Arc::clone(&writer);
    let cb_gate = Arc::clone(&gate);
    let cb_written = Arc::clone(&written);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            if !cb_gate.load(Ordering::Acquire) {
                return;
            }
            if let Ok(mut writer) = cb_writer.lock() {
                if let Some(writer) = writer.as_mut() {
                    for &sample in data {
                        let s = (sample * i16::MAX as f32)
                            .clamp(i16::MIN as f32, i16::MAX as f32)
                            as i16;
                        writer.write_sample(s).ok();
                    }
                    cb_written.fetch_add(data.len() as u64, Ordering::Relaxed);
                }
            }
        },
        |err| {
            error!("Input stream error: {}", err);
        },
        None,
    );

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(
                anyhow::Error::new(e).context("Failed to build input stream")
            ));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(
            anyhow::Error::new(e).context("Failed to start input stream")
        ));
        return;
    }

    info!(
        "Microphone capture started: {} Hz, {} channel(s) -> {}",
        config.sample_rate.0,
        config.channels,
        output.display()
    );

    let _ = ready_tx.send(Ok(()));

    loop {
        match cmd_rx.recv() {
            Ok(Command::Pause(ack)) => {
                gate.store(false, Ordering::Release);
                let _ = ack.send(());
            }
            Ok(Command::Resume(ack)) => {
                gate.store(true, Ordering::Release);
                let _ = ack.send(());
            }
            // A dropped sender means the backend went away; finalize anyway
            Ok(Command::Stop) | Err(_) => break,
        }
    }

    drop(stream);
    active.store(false, Ordering::Release);

    let result = writer
        .lock()
        .expect("wav writer mutex poisoned")
        .take()
        .map(|w| w.finalize())
        .transpose()
        .context("Failed to finalize WAV file")
        .map(|_| written.load(Ordering::Relaxed));

    let _ = done_tx.send(result);
}


/// Pick the input stream configuration closest to the requested shape
fn input_config_for(
    device: &Device,
    sample_rate_hz: u32,
    channel_count: u16,
) -> Result<StreamConfig> {
    let ranges = device
        .supported_input_configs()
        .context("Failed to query input configurations")?;

    let mut best = None;
    let mut best_diff = u32::MAX;

    for range in ranges {
        if range.sample_format() != cpal::SampleFormat::F32 {
            continue;
        }
        let rate = sample_rate_hz.clamp(range.min_sample_rate().0, range.max_sample_rate().0);
        let diff = rate.abs_diff(sample_rate_hz);
        if diff < best_diff {
            best_diff = diff;
            best = Some((range.channels(), rate));
        }
    }

    let (max_channels, rate) =
        best.ok_or_else(|| anyhow!("No f32 input configuration available"))?;

    Ok(StreamConfig {
        channels: channel_count.min(max_channels),
        sample_rate: cpal::SampleRate(rate),
        buffer_size: cpal::BufferSize::Default,
    })
}
