use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, instrument, warn};

use tollgate_core::{CallerId, QuotaDecision, QuotaKey, next_utc_midnight};
use tollgate_state::CounterStore;

use crate::health::BackendHealth;
use crate::metrics::GateMetrics;

/// Quota records live one day from first use.
const QUOTA_TTL: Duration = Duration::from_secs(86_400);

/// Longer-horizon counter for metered capabilities, distinct from raw
/// request-rate limiting.
///
/// Each `consume` call is a new consumption event against the caller's
/// day-bucketed counter, not a query. When the shared backend is
/// unreachable the ledger degrades to always-allow, uncounted: quotas are
/// lower-frequency and less latency-sensitive than window checks, so they
/// carry no in-memory twin.
pub struct QuotaLedger {
    store: Arc<dyn CounterStore>,
    health: Arc<BackendHealth>,
    metrics: Arc<GateMetrics>,
}

impl QuotaLedger {
    /// Create a ledger over the shared store, typically sharing the health
    /// monitor and metrics with an [`AdmissionGate`](crate::AdmissionGate).
    #[must_use]
    pub fn new(
        store: Arc<dyn CounterStore>,
        health: Arc<BackendHealth>,
        metrics: Arc<GateMetrics>,
    ) -> Self {
        Self {
            store,
            health,
            metrics,
        }
    }

    /// Consume one unit of a metered feature for today.
    ///
    /// Never fails: backend errors flip the health monitor and degrade to an
    /// uncounted allow. Denial does not roll the counter back — slight
    /// overshoot under concurrency is preferred to false denial.
    #[instrument(name = "ledger.consume", skip_all, fields(feature = feature))]
    pub async fn consume(
        &self,
        caller: &CallerId,
        feature: &str,
        daily_limit: u32,
    ) -> QuotaDecision {
        let now = Utc::now();
        let reset_at = next_utc_midnight(now);
        let limit = u64::from(daily_limit);

        if !self.health.is_available() {
            self.metrics.increment_quota_uncounted();
            return QuotaDecision {
                allowed: true,
                used: 0,
                remaining: limit,
                reset_at,
            };
        }

        let key = QuotaKey::new(caller, feature, now);
        let used = match self.store.increment_day(&key, QUOTA_TTL).await {
            Ok(value) => u64::try_from(value).unwrap_or(0),
            Err(e) => {
                warn!(error = %e, "quota increment failed, allowing uncounted");
                self.health.mark_unavailable();
                self.metrics.increment_quota_uncounted();
                return QuotaDecision {
                    allowed: true,
                    used: 0,
                    remaining: limit,
                    reset_at,
                };
            }
        };

        let allowed = used <= limit;
        if allowed {
            self.metrics.increment_quota_allowed();
        } else {
            self.metrics.increment_quota_denied();
            info!(caller = %caller, used, limit, "daily quota exhausted");
        }

        QuotaDecision {
            allowed,
            used,
            remaining: limit.saturating_sub(used),
            reset_at,
        }
    }
}
