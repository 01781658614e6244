//! Outage behavior: a failing shared backend must never surface as a
//! request error, and counting must continue locally until an explicit
//! re-probe.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use tollgate_core::{CallerContext, CallerId, PolicyTable, QuotaKey, TierPolicy, WindowKey};
use tollgate_gate::{AdmissionGate, BackendHealth, GateMetrics, QuotaLedger, RequestContext};
use tollgate_state::StateError;
use tollgate_state::store::{BackendProbe, QuotaCounter, WindowCounter, WindowDecision};
use tollgate_state_memory::MemoryCounterStore;

/// Shared-backend stand-in that can be switched into a failing state.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryCounterStore,
    failing: AtomicBool,
    window_calls: AtomicU64,
}

impl FlakyStore {
    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn window_calls(&self) -> u64 {
        self.window_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WindowCounter for FlakyStore {
    async fn check_and_record(
        &self,
        key: &WindowKey,
        limit: u32,
        window: Duration,
    ) -> Result<WindowDecision, StateError> {
        self.window_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StateError::Connection("connection refused".into()));
        }
        self.inner.check_and_record(key, limit, window).await
    }
}

#[async_trait]
impl QuotaCounter for FlakyStore {
    async fn increment_day(&self, key: &QuotaKey, ttl: Duration) -> Result<i64, StateError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StateError::Connection("connection refused".into()));
        }
        self.inner.increment_day(key, ttl).await
    }
}

#[async_trait]
impl BackendProbe for FlakyStore {
    async fn probe(&self) -> Result<(), StateError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StateError::Connection("connection refused".into()));
        }
        Ok(())
    }
}

fn minute_only(limit: u32) -> PolicyTable {
    let policy = TierPolicy {
        requests_per_minute: limit,
        requests_per_hour: 0,
        requests_per_day: 0,
        burst_allowance: 0,
    };
    PolicyTable {
        free: policy.clone(),
        mid: policy.clone(),
        top: policy.clone(),
        admin: policy,
    }
}

fn anonymous_ctx() -> RequestContext {
    RequestContext::new(
        "/v1/chat",
        CallerContext::Anonymous {
            ip: "198.51.100.4".into(),
            user_agent: "integration-test".into(),
        },
    )
}

#[tokio::test]
async fn backend_failure_switches_to_consistent_local_counting() {
    let store = Arc::new(FlakyStore::default());
    let gate = AdmissionGate::builder()
        .policies(minute_only(3))
        .primary(store.clone())
        .build()
        .unwrap();
    let ctx = anonymous_ctx();

    // Healthy: the primary answers.
    let first = gate.admit(&ctx).await;
    assert!(first.allowed);
    assert_eq!(store.window_calls(), 1);

    store.set_failing(true);

    // The failing call is answered by the fallback, not an error.
    let second = gate.admit(&ctx).await;
    assert!(second.allowed);
    assert_eq!(store.window_calls(), 2);

    // The fallback starts its own count: two more admissions fit, the
    // fourth local attempt is denied, all still at the free-tier limit.
    assert!(gate.admit(&ctx).await.allowed);
    assert!(gate.admit(&ctx).await.allowed);
    let denied = gate.admit(&ctx).await;
    assert!(!denied.allowed);
    assert_eq!(denied.remaining, 0);

    // The primary was never retried inline after the failure.
    assert_eq!(store.window_calls(), 2);
    assert!(gate.metrics().snapshot().fallback_checks >= 4);
}

#[tokio::test]
async fn explicit_probe_restores_the_primary() {
    let store = Arc::new(FlakyStore::default());
    let gate = AdmissionGate::builder()
        .policies(minute_only(100))
        .primary(store.clone())
        .build()
        .unwrap();
    let ctx = anonymous_ctx();

    store.set_failing(true);
    gate.admit(&ctx).await;
    let calls_after_failure = store.window_calls();

    // Still down: no inline retry against the primary.
    gate.admit(&ctx).await;
    assert_eq!(store.window_calls(), calls_after_failure);

    // Backend recovers, but only an explicit probe flips health back.
    store.set_failing(false);
    gate.admit(&ctx).await;
    assert_eq!(store.window_calls(), calls_after_failure);

    assert!(gate.probe_backend().await);
    gate.admit(&ctx).await;
    assert_eq!(store.window_calls(), calls_after_failure + 1);
}

#[tokio::test]
async fn startup_probe_failure_starts_in_fallback_mode() {
    let store = Arc::new(FlakyStore::default());
    store.set_failing(true);

    let gate = AdmissionGate::builder()
        .policies(minute_only(5))
        .primary(store.clone())
        .build()
        .unwrap();

    assert!(!gate.probe_backend().await);

    let decision = gate.admit(&anonymous_ctx()).await;
    assert!(decision.allowed);
    assert_eq!(
        store.window_calls(),
        0,
        "an unavailable backend must not be hit on the request path"
    );
}

#[tokio::test]
async fn window_failure_also_degrades_the_quota_ledger() {
    let store = Arc::new(FlakyStore::default());
    let health = Arc::new(BackendHealth::new());
    let metrics = Arc::new(GateMetrics::default());

    let gate = AdmissionGate::builder()
        .policies(minute_only(100))
        .primary(store.clone())
        .health(health.clone())
        .metrics(metrics.clone())
        .build()
        .unwrap();
    let ledger = QuotaLedger::new(store.clone(), health, metrics.clone());
    let caller = CallerId::User("u-9".into());

    // Healthy: consumption is counted.
    let counted = ledger.consume(&caller, "summarize", 5).await;
    assert!(counted.allowed);
    assert_eq!(counted.used, 1);

    // A window-check failure flips the shared health monitor...
    store.set_failing(true);
    gate.admit(&anonymous_ctx()).await;

    // ...and the ledger degrades to allow-uncounted without touching the
    // backend again.
    let uncounted = ledger.consume(&caller, "summarize", 5).await;
    assert!(uncounted.allowed);
    assert_eq!(uncounted.used, 0);
    assert_eq!(metrics.snapshot().quota_uncounted, 1);
}
