use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use tollgate_core::{QuotaKey, WindowKey};
use tollgate_state::error::StateError;
use tollgate_state::store::{
    BackendProbe, QuotaCounter, WindowCounter, WindowDecision, decision_from_count,
};

/// Sweep is attempted once per this many counting operations.
const SWEEP_EVERY_OPS: u64 = 4_096;

/// Keys empty and untouched for this long are dropped by the amortized sweep.
const SWEEP_GRACE: Duration = Duration::from_secs(300);

/// One caller's trailing-window event list.
#[derive(Debug)]
struct WindowEntry {
    events: VecDeque<Instant>,
    /// Window length of the most recent access, used by the sweep to prune
    /// without knowing the caller's tier.
    window: Duration,
    touched_at: Instant,
}

#[derive(Debug)]
struct QuotaEntry {
    count: i64,
    expires_at: Instant,
}

/// Process-local counter store backed by a [`DashMap`].
///
/// The map's per-shard locks provide the per-key critical section: one
/// check-and-record prunes, counts, and appends under a single entry guard,
/// so concurrent callers for the same key serialize while different keys
/// proceed in parallel.
///
/// Serves as the primary backend for dev and test deployments and as the
/// fallback the admission gate switches to when the shared backend is
/// unreachable. Entries are created on first access and garbage-collected by
/// an amortized sweep once empty and untouched past a grace period; there is
/// no background thread.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    windows: DashMap<String, WindowEntry>,
    quotas: DashMap<String, QuotaEntry>,
    ops: AtomicU64,
}

impl MemoryCounterStore {
    /// Create a new, empty in-memory counter store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of window keys currently tracked.
    #[must_use]
    pub fn tracked_window_keys(&self) -> usize {
        self.windows.len()
    }

    /// Drop window entries that are empty and untouched past `grace`, and
    /// quota entries past their expiry.
    pub fn sweep(&self, grace: Duration) {
        let now = Instant::now();
        self.windows.retain(|_, entry| {
            prune(&mut entry.events, now, entry.window);
            !entry.events.is_empty() || now.duration_since(entry.touched_at) < grace
        });
        self.quotas.retain(|_, entry| entry.expires_at > now);
    }

    fn maybe_sweep(&self) {
        if self.ops.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY_OPS == SWEEP_EVERY_OPS - 1 {
            self.sweep(SWEEP_GRACE);
        }
    }
}

/// Drop events that have slid out of the trailing window.
fn prune(events: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    if let Some(cutoff) = now.checked_sub(window) {
        while events.front().is_some_and(|&ts| ts <= cutoff) {
            events.pop_front();
        }
    }
}

#[async_trait]
impl WindowCounter for MemoryCounterStore {
    async fn check_and_record(
        &self,
        key: &WindowKey,
        limit: u32,
        window: Duration,
    ) -> Result<WindowDecision, StateError> {
        let now = Instant::now();
        let rendered = key.canonical();

        let count_before = {
            let mut entry = self.windows.entry(rendered).or_insert_with(|| WindowEntry {
                events: VecDeque::new(),
                window,
                touched_at: now,
            });
            prune(&mut entry.events, now, window);
            let count = entry.events.len() as u64;
            // Attempts count, not just admissions: append before the limit
            // comparison is surfaced.
            entry.events.push_back(now);
            entry.window = window;
            entry.touched_at = now;
            count
        };

        self.maybe_sweep();
        Ok(decision_from_count(count_before, limit, window))
    }
}

#[async_trait]
impl QuotaCounter for MemoryCounterStore {
    async fn increment_day(&self, key: &QuotaKey, ttl: Duration) -> Result<i64, StateError> {
        let now = Instant::now();
        let rendered = key.canonical();

        // Expired counters restart from zero.
        self.quotas
            .remove_if(&rendered, |_, entry| entry.expires_at <= now);

        let mut entry = self.quotas.entry(rendered).or_insert_with(|| QuotaEntry {
            count: 0,
            // Expiry is fixed at creation; later increments do not extend it.
            expires_at: now + ttl,
        });
        entry.count += 1;
        Ok(entry.count)
    }
}

#[async_trait]
impl BackendProbe for MemoryCounterStore {
    async fn probe(&self) -> Result<(), StateError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tollgate_core::{CallerId, Granularity};
    use tollgate_state::testing::run_counter_conformance_tests;

    use super::*;

    fn minute_key(id: &str) -> WindowKey {
        WindowKey::new(CallerId::User(id.to_owned()), Granularity::Minute)
    }

    #[tokio::test]
    async fn conformance() {
        let store = MemoryCounterStore::new();
        run_counter_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }

    #[tokio::test(start_paused = true)]
    async fn window_slides_past_old_events() {
        let store = MemoryCounterStore::new();
        let key = minute_key("slide");
        let window = Duration::from_secs(60);

        for _ in 0..2 {
            let decision = store.check_and_record(&key, 2, window).await.unwrap();
            assert!(decision.allowed);
        }
        let denied = store.check_and_record(&key, 2, window).await.unwrap();
        assert!(!denied.allowed);

        // After a full quiet window every recorded attempt has slid out.
        tokio::time::advance(Duration::from_secs(61)).await;
        let decision = store.check_and_record(&key, 2, window).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.count_before, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn denied_attempts_extend_the_denial() {
        let store = MemoryCounterStore::new();
        let key = minute_key("retry-storm");
        let window = Duration::from_secs(10);

        let first = store.check_and_record(&key, 1, window).await.unwrap();
        assert!(first.allowed);

        tokio::time::advance(Duration::from_secs(5)).await;
        let denied = store.check_and_record(&key, 1, window).await.unwrap();
        assert!(!denied.allowed);

        // The admitted event is out of the window now, but the denied
        // attempt at t+5 still counts against the retrying caller.
        tokio::time::advance(Duration::from_secs(6)).await;
        let still_denied = store.check_and_record(&key, 1, window).await.unwrap();
        assert!(!still_denied.allowed);
        assert_eq!(still_denied.count_before, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_tasks_never_admit_past_the_limit() {
        let store = std::sync::Arc::new(MemoryCounterStore::new());
        let key = minute_key("contended");
        let window = Duration::from_secs(60);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                let mut admitted = 0u32;
                for _ in 0..5 {
                    let decision = store.check_and_record(&key, 10, window).await.unwrap();
                    if decision.allowed {
                        admitted += 1;
                    }
                }
                admitted
            }));
        }

        let mut total_admitted = 0;
        for handle in handles {
            total_admitted += handle.await.unwrap();
        }
        assert_eq!(total_admitted, 10, "admissions must match the limit exactly");
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_drops_only_empty_and_stale_keys() {
        let store = MemoryCounterStore::new();
        let key = minute_key("sweepable");
        let window = Duration::from_secs(5);

        store.check_and_record(&key, 5, window).await.unwrap();
        assert_eq!(store.tracked_window_keys(), 1);

        // Events have slid out but the key was touched recently: kept.
        tokio::time::advance(Duration::from_secs(6)).await;
        store.sweep(Duration::from_secs(60));
        assert_eq!(store.tracked_window_keys(), 1);

        // Past the grace period the empty entry is collected.
        tokio::time::advance(Duration::from_secs(60)).await;
        store.sweep(Duration::from_secs(60));
        assert_eq!(store.tracked_window_keys(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn quota_counter_resets_after_expiry() {
        let store = MemoryCounterStore::new();
        let key = QuotaKey::new(
            &CallerId::User("q".into()),
            "summarize",
            chrono::Utc::now(),
        );
        let ttl = Duration::from_secs(10);

        assert_eq!(store.increment_day(&key, ttl).await.unwrap(), 1);
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(store.increment_day(&key, ttl).await.unwrap(), 2);

        // The expiry was fixed at creation; the second increment did not
        // extend it, so the counter restarts once the original TTL lapses.
        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(store.increment_day(&key, ttl).await.unwrap(), 1);
    }
}
