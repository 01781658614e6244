use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{info, warn};

use tollgate_state::BackendProbe;

/// Process-wide reachability state for the shared counting backend.
///
/// Starts optimistic: the backend is assumed available until a probe or a
/// counting failure says otherwise. Once unavailable it stays unavailable —
/// there is no automatic reconnection between probes, so a flapping backend
/// cannot whipsaw the gate. Only a fresh explicit [`probe`](Self::probe)
/// (startup, or a manual health re-check) can flip it back.
#[derive(Debug)]
pub struct BackendHealth {
    available: AtomicBool,
    last_check: Mutex<Option<DateTime<Utc>>>,
}

impl Default for BackendHealth {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendHealth {
    /// Create a monitor in the optimistic initial state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            last_check: Mutex::new(None),
        }
    }

    /// Perform a liveness round trip and record the outcome.
    pub async fn probe<B>(&self, backend: &B) -> bool
    where
        B: BackendProbe + ?Sized,
    {
        let available = match backend.probe().await {
            Ok(()) => {
                info!("shared backend probe succeeded");
                true
            }
            Err(e) => {
                warn!(error = %e, "shared backend probe failed");
                false
            }
        };
        self.available.store(available, Ordering::Relaxed);
        *self.last_check.lock() = Some(Utc::now());
        available
    }

    /// Flip to unavailable after a counting failure.
    ///
    /// No retry happens inline; retries are deferred to the next explicit
    /// probe so the failing request path pays no extra latency.
    pub fn mark_unavailable(&self) {
        if self.available.swap(false, Ordering::Relaxed) {
            warn!("shared backend marked unavailable, switching to local counting");
        }
    }

    /// Whether the shared backend is currently considered reachable.
    ///
    /// A plain flag read; never performs I/O.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    /// When the backend was last probed, if ever.
    #[must_use]
    pub fn last_check(&self) -> Option<DateTime<Utc>> {
        *self.last_check.lock()
    }
}
