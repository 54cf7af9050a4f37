//! HTTP API for controlling the recording session
//!
//! - POST /recording/start - Start a recording (optional options body)
//! - POST /recording/pause - Pause the active recording
//! - POST /recording/resume - Resume a paused recording
//! - POST /recording/stop - Stop and return the finished file path
//! - GET /recording/state - Query session state
//! - GET /recording/events - SSE stream of state-change events
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
