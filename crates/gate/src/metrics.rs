use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters tracking admission outcomes.
///
/// All counters use relaxed ordering for maximum throughput. For a
/// consistent point-in-time view, call [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct GateMetrics {
    /// Requests admitted within their limits.
    pub admitted: AtomicU64,
    /// Requests denied by a window limit.
    pub denied: AtomicU64,
    /// Requests that bypassed limiting via an exempt path.
    pub exempted: AtomicU64,
    /// Window checks answered by the local fallback counter.
    pub fallback_checks: AtomicU64,
    /// Requests allowed because of an internal fault at the gate boundary.
    pub fail_open: AtomicU64,
    /// Quota consumptions within the daily limit.
    pub quota_allowed: AtomicU64,
    /// Quota consumptions denied by the daily limit.
    pub quota_denied: AtomicU64,
    /// Quota consumptions allowed uncounted while the backend was down.
    pub quota_uncounted: AtomicU64,
}

/// Point-in-time copy of [`GateMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub admitted: u64,
    pub denied: u64,
    pub exempted: u64,
    pub fallback_checks: u64,
    pub fail_open: u64,
    pub quota_allowed: u64,
    pub quota_denied: u64,
    pub quota_uncounted: u64,
}

impl GateMetrics {
    /// Increment the admitted counter.
    pub fn increment_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the denied counter.
    pub fn increment_denied(&self) {
        self.denied.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the exempted counter.
    pub fn increment_exempted(&self) {
        self.exempted.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the fallback checks counter.
    pub fn increment_fallback_checks(&self) {
        self.fallback_checks.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the fail-open counter.
    pub fn increment_fail_open(&self) {
        self.fail_open.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the quota allowed counter.
    pub fn increment_quota_allowed(&self) {
        self.quota_allowed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the quota denied counter.
    pub fn increment_quota_denied(&self) {
        self.quota_denied.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the quota uncounted counter.
    pub fn increment_quota_uncounted(&self) {
        self.quota_uncounted.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a consistent snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            admitted: self.admitted.load(Ordering::Relaxed),
            denied: self.denied.load(Ordering::Relaxed),
            exempted: self.exempted.load(Ordering::Relaxed),
            fallback_checks: self.fallback_checks.load(Ordering::Relaxed),
            fail_open: self.fail_open.load(Ordering::Relaxed),
            quota_allowed: self.quota_allowed.load(Ordering::Relaxed),
            quota_denied: self.quota_denied.load(Ordering::Relaxed),
            quota_uncounted: self.quota_uncounted.load(Ordering::Relaxed),
        }
    }
}
