use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Background execution capability
///
/// Keeps the process eligible for background work while a recording runs
/// (foreground service on Android, background audio session on iOS, nothing
/// on a plain server process). `acquire` may complete asynchronously; OS
/// handshakes hide behind the await. Acquire/release are paired 1:1 with
/// recording start and stop, including forced cleanup.
#[async_trait::async_trait]
pub trait ExecutionGuard: Send + Sync {
    /// Acquire the keepalive for the span of one recording
    async fn acquire(&self) -> Result<()>;

    /// Best-effort release; logs problems, never fails
    async fn release(&self);

    /// Guard name for logging
    fn name(&self) -> &str;
}

/// Guard for hosts whose process lifetime is already managed externally
///
/// Tracks pairing so mismatched acquire/release still get flagged in logs.
pub struct NullExecutionGuard {
    held: AtomicBool,
}

impl NullExecutionGuard {
    pub fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
        }
    }
}

impl Default for NullExecutionGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ExecutionGuard for NullExecutionGuard {
    async fn acquire(&self) -> Result<()> {
        if self.held.swap(true, Ordering::SeqCst) {
            warn!("Execution guard acquired twice without a release");
        }
        debug!("Execution guard acquired");
        Ok(())
    }

    async fn release(&self) {
        if !self.held.swap(false, Ordering::SeqCst) {
            warn!("Execution guard released without a matching acquire");
        }
        debug!("Execution guard released");
    }

    fn name(&self) -> &str {
        "null"
    }
}
