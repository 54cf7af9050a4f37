use super::state::AppState;
use crate::device::RecordedFile;
use crate::session::{RecordingError, RecordingOptions};
use anyhow::anyhow;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Json, Response},
};
use futures::Stream;
use serde::Serialize;
use std::convert::Infallible;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StartRecordingResponse {
    pub recording_id: Uuid,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopRecordingResponse {
    /// Absolute path of the finished recording
    pub path: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Umbrella code carried by every recording failure
    pub error: &'static str,
    /// Stable per-failure code
    pub code: &'static str,
    pub message: String,
}

fn error_response(err: RecordingError) -> Response {
    let status = match &err {
        RecordingError::AlreadyRecording
        | RecordingError::NotRecording
        | RecordingError::AlreadyPaused
        | RecordingError::NotPaused
        | RecordingError::OperationInProgress => StatusCode::CONFLICT,
        RecordingError::InvalidOptions(_) => StatusCode::BAD_REQUEST,
        RecordingError::PermissionDenied => StatusCode::FORBIDDEN,
        RecordingError::UnsupportedOnPlatform => StatusCode::NOT_IMPLEMENTED,
        RecordingError::Device(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: "ERR_RECORDING",
            code: err.code(),
            message: err.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /recording/start
/// Start a recording, optionally with explicit options
///
/// An absent body means service defaults; a body that fails to parse is a
/// caller error and must not silently start with defaults.
pub async fn start_recording(
    State(state): State<AppState>,
    body: Bytes,
) -> impl IntoResponse {
    let options = if body.is_empty() {
        state.defaults.clone()
    } else {
        match serde_json::from_slice::<RecordingOptions>(&body) {
            Ok(options) => options,
            Err(e) => {
                warn!("Rejected malformed recording options: {}", e);
                return error_response(RecordingError::InvalidOptions(anyhow!(
                    "malformed options body: {}",
                    e
                )));
            }
        }
    };

    match state.session.start(options).await {
        Ok(recording_id) => (
            StatusCode::OK,
            Json(StartRecordingResponse {
                recording_id,
                status: "recording".to_string(),
                message: format!("Recording {} started", recording_id),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to start recording: {}", e);
            error_response(e)
        }
    }
}

/// POST /recording/pause
pub async fn pause_recording(State(state): State<AppState>) -> impl IntoResponse {
    match state.session.pause().await {
        Ok(()) => (
            StatusCode::OK,
            Json(TransitionResponse {
                status: "paused".to_string(),
                message: "Recording paused".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to pause recording: {}", e);
            error_response(e)
        }
    }
}

/// POST /recording/resume
pub async fn resume_recording(State(state): State<AppState>) -> impl IntoResponse {
    match state.session.resume().await {
        Ok(()) => (
            StatusCode::OK,
            Json(TransitionResponse {
                status: "recording".to_string(),
                message: "Recording resumed".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to resume recording: {}", e);
            error_response(e)
        }
    }
}

/// POST /recording/stop
/// Stop the active recording and return the finished file path
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    match state.session.stop().await {
        Ok(path) => {
            // Header-only probe for the completion log; not all backends
            // write WAV, so failure here is fine
            match RecordedFile::probe(&path) {
                Ok(file) => info!(
                    "Recording finished: {} ({:.1}s, {} Hz, {} channel(s))",
                    file.path.display(),
                    file.duration_seconds,
                    file.sample_rate,
                    file.channels
                ),
                Err(e) => debug!("Could not probe finished recording: {:#}", e),
            }

            (
                StatusCode::OK,
                Json(StopRecordingResponse {
                    path: path.display().to_string(),
                    status: "idle".to_string(),
                    message: "Recording stopped".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to stop recording: {}", e);
            error_response(e)
        }
    }
}

/// GET /recording/state
/// Never fails; reports idle with zero duration when nothing is recording
pub async fn get_recording_state(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.session.state()))
}

/// GET /recording/events
/// Server-sent stream of state-change events
pub async fn recording_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => match Event::default().json_data(&event) {
                    Ok(sse_event) => return Some((Ok(sse_event), rx)),
                    Err(e) => {
                        warn!("Failed to encode state event: {}", e);
                        continue;
                    }
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event stream lagged, {} events dropped", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
