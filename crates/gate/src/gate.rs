use std::sync::Arc;
use std::time::Duration;

use tracing::{error, instrument, warn};

use tollgate_core::{
    AdmissionDecision, CallerContext, CallerId, Granularity, PolicyTable, Tier, WindowKey,
};
use tollgate_state::store::{CounterStore, WindowCounter, WindowDecision, decision_from_count};
use tollgate_state_memory::MemoryCounterStore;

use crate::error::GateError;
use crate::health::BackendHealth;
use crate::metrics::GateMetrics;

/// The slice of an incoming request the gate needs to decide admission.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Request path, matched against the exempt prefixes.
    pub path: String,
    /// Caller identity as supplied by the identity collaborator.
    pub caller: CallerContext,
}

impl RequestContext {
    /// Build a context for the given path and caller.
    #[must_use]
    pub fn new(path: impl Into<String>, caller: CallerContext) -> Self {
        Self {
            path: path.into(),
            caller,
        }
    }
}

/// The request-facing admission-control entry point.
///
/// Resolves caller identity to a tier, evaluates one window check per
/// configured granularity (smallest window first), and returns an
/// admit/deny decision. Counting goes to the shared backend while the
/// [`BackendHealth`] monitor reports it reachable, and to the process-local
/// fallback otherwise.
///
/// `admit` never fails: a limiter must not become the outage source for the
/// service it protects, so every internal fault is logged and converted to
/// allow-and-continue.
pub struct AdmissionGate {
    policies: PolicyTable,
    primary: Arc<dyn CounterStore>,
    fallback: Arc<MemoryCounterStore>,
    health: Arc<BackendHealth>,
    exempt_prefixes: Vec<String>,
    metrics: Arc<GateMetrics>,
}

impl AdmissionGate {
    pub(crate) fn new(
        policies: PolicyTable,
        primary: Arc<dyn CounterStore>,
        health: Arc<BackendHealth>,
        exempt_prefixes: Vec<String>,
        metrics: Arc<GateMetrics>,
    ) -> Self {
        Self {
            policies,
            primary,
            fallback: Arc::new(MemoryCounterStore::new()),
            health,
            exempt_prefixes,
            metrics,
        }
    }

    /// Create a builder for constructing a gate.
    #[must_use]
    pub fn builder() -> crate::builder::GateBuilder {
        crate::builder::GateBuilder::new()
    }

    /// The health monitor shared with the quota ledger.
    #[must_use]
    pub fn health(&self) -> Arc<BackendHealth> {
        Arc::clone(&self.health)
    }

    /// The admission metrics shared with the quota ledger.
    #[must_use]
    pub fn metrics(&self) -> Arc<GateMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Probe the shared backend and update the health monitor.
    ///
    /// Called once at startup; hosts may also call it for a manual health
    /// re-check. This is the only path that can restore the primary backend
    /// after an outage.
    pub async fn probe_backend(&self) -> bool {
        self.health.probe(self.primary.as_ref()).await
    }

    /// Decide whether a request may proceed.
    ///
    /// Never returns an error and never panics the request path: an internal
    /// fault downgrades to an allow-and-continue decision.
    #[instrument(name = "gate.admit", skip_all, fields(path = %ctx.path))]
    pub async fn admit(&self, ctx: &RequestContext) -> AdmissionDecision {
        match self.evaluate(ctx).await {
            Ok(decision) => decision,
            Err(e) => {
                error!(error = %e, "admission evaluation failed, allowing request");
                self.metrics.increment_fail_open();
                AdmissionDecision::unlimited(Tier::Free)
            }
        }
    }

    async fn evaluate(&self, ctx: &RequestContext) -> Result<AdmissionDecision, GateError> {
        // Exempt prefixes bypass everything, including identity resolution,
        // and leave no counter behind.
        if self.is_exempt(&ctx.path) {
            self.metrics.increment_exempted();
            return Ok(AdmissionDecision::unlimited(Tier::Free));
        }

        let caller = CallerId::from_context(&ctx.caller);
        let (tier, policy) = self.policies.resolve(ctx.caller.tier_raw());

        // Smallest window first: it is the cheapest check and the most
        // frequently violated one.
        let mut tightest: Option<AdmissionDecision> = None;
        for granularity in Granularity::ALL {
            let limit = policy.limit_for(granularity);
            if limit == 0 {
                continue;
            }

            let key = WindowKey::new(caller.clone(), granularity);
            let window = granularity.window();
            let sample = self.check_window(&key, limit, window).await;

            if !sample.allowed {
                self.metrics.increment_denied();
                return Ok(AdmissionDecision {
                    allowed: false,
                    limit,
                    remaining: 0,
                    reset_at: sample.reset_at,
                    // The window length, not a recomputed distance: a
                    // throttling hint does not need to be exact.
                    retry_after: Some(window.as_secs()),
                    limit_type: granularity.into(),
                    tier,
                });
            }

            let candidate = AdmissionDecision {
                allowed: true,
                limit,
                remaining: sample.remaining,
                reset_at: sample.reset_at,
                retry_after: None,
                limit_type: granularity.into(),
                tier,
            };
            tightest = Some(match tightest {
                Some(current) if current.remaining <= candidate.remaining => current,
                _ => candidate,
            });
        }

        self.metrics.increment_admitted();
        Ok(tightest.unwrap_or_else(|| AdmissionDecision::unlimited(tier)))
    }

    /// Run one window check against the active backend.
    ///
    /// A shared-backend failure flips the health monitor and re-answers the
    /// same check from the local fallback; subsequent checks skip the
    /// primary entirely until an explicit re-probe.
    async fn check_window(&self, key: &WindowKey, limit: u32, window: Duration) -> WindowDecision {
        if self.health.is_available() {
            match self.primary.check_and_record(key, limit, window).await {
                Ok(decision) => return decision,
                Err(e) => {
                    warn!(
                        error = %e,
                        key = %key,
                        "shared backend check failed, answering from local counter"
                    );
                    self.health.mark_unavailable();
                }
            }
        }

        self.metrics.increment_fallback_checks();
        match self.fallback.check_and_record(key, limit, window).await {
            Ok(decision) => decision,
            Err(e) => {
                // Strict fail-open: even the local counter failing must not
                // surface as a request failure.
                warn!(error = %e, key = %key, "local counter failed, admitting");
                decision_from_count(0, limit, window)
            }
        }
    }

    fn is_exempt(&self, path: &str) -> bool {
        self.exempt_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }
}
