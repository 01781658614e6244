use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tollgate_core::{QuotaKey, WindowKey};

use crate::error::StateError;

/// Result of one sliding-window check-and-record operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowDecision {
    /// Whether the event fits within the limit.
    pub allowed: bool,
    /// Events already in the window before this one was recorded.
    pub count_before: u64,
    /// Events left in the window after this one.
    pub remaining: u32,
    /// When the window has fully slid past this event.
    pub reset_at: DateTime<Utc>,
}

/// Derive the decision both backends return for a given pre-insert count.
///
/// Shared so that primary and fallback counting agree on the math:
/// `allowed = count_before < limit`, `remaining = limit - count_before - 1`
/// clamped at zero. The event is recorded regardless of the outcome
/// (attempts count, not just admissions).
#[must_use]
pub fn decision_from_count(count_before: u64, limit: u32, window: Duration) -> WindowDecision {
    let allowed = count_before < u64::from(limit);
    let remaining = u32::try_from(u64::from(limit).saturating_sub(count_before + 1)).unwrap_or(0);
    let reset_at = chrono::Duration::from_std(window)
        .map_or_else(|_| Utc::now(), |delta| Utc::now() + delta);
    WindowDecision {
        allowed,
        count_before,
        remaining,
        reset_at,
    }
}

/// The counting primitive: given a key and a window, answers "is this event
/// admissible, and what remains."
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
/// The prune/count/insert sequence must execute atomically per key so that
/// concurrent callers never observe a torn read.
#[async_trait]
pub trait WindowCounter: Send + Sync {
    /// Drop events older than the window, count the rest, record a new event
    /// at `now`, and refresh the entry's expiry — as one atomic unit.
    async fn check_and_record(
        &self,
        key: &WindowKey,
        limit: u32,
        window: Duration,
    ) -> Result<WindowDecision, StateError>;
}

/// Longer-horizon counter used by the quota ledger.
#[async_trait]
pub trait QuotaCounter: Send + Sync {
    /// Atomically increment the day-bucketed counter and return the
    /// post-increment value. The expiry is set only when the increment
    /// creates the entry, so later calls do not reset the clock.
    async fn increment_day(&self, key: &QuotaKey, ttl: Duration) -> Result<i64, StateError>;
}

/// Liveness check used by the backend health monitor.
#[async_trait]
pub trait BackendProbe: Send + Sync {
    /// Perform a lightweight round trip to the backend.
    async fn probe(&self) -> Result<(), StateError>;
}

/// A full counting backend, injectable as one `Arc<dyn CounterStore>`.
pub trait CounterStore: WindowCounter + QuotaCounter + BackendProbe {}

impl<T: WindowCounter + QuotaCounter + BackendProbe> CounterStore for T {}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn counts_below_limit_are_allowed() {
        for count_before in 0..3 {
            let decision = decision_from_count(count_before, 3, WINDOW);
            assert!(decision.allowed, "count {count_before} should be allowed");
        }
    }

    #[test]
    fn remaining_decrements_to_zero() {
        assert_eq!(decision_from_count(0, 3, WINDOW).remaining, 2);
        assert_eq!(decision_from_count(1, 3, WINDOW).remaining, 1);
        assert_eq!(decision_from_count(2, 3, WINDOW).remaining, 0);
    }

    #[test]
    fn count_at_limit_is_denied_with_zero_remaining() {
        let decision = decision_from_count(3, 3, WINDOW);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn counts_far_over_limit_stay_clamped() {
        let decision = decision_from_count(1_000, 3, WINDOW);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn reset_at_is_one_window_out() {
        let before = Utc::now();
        let decision = decision_from_count(0, 3, WINDOW);
        let delta = decision.reset_at - before;
        assert!(delta >= chrono::Duration::seconds(59));
        assert!(delta <= chrono::Duration::seconds(61));
    }

    #[test]
    fn zero_limit_denies_everything() {
        let decision = decision_from_count(0, 0, WINDOW);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }
}
