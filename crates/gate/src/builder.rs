use std::sync::Arc;

use tollgate_core::PolicyTable;
use tollgate_state::CounterStore;

use crate::error::GateError;
use crate::gate::AdmissionGate;
use crate::health::BackendHealth;
use crate::metrics::GateMetrics;

/// Fluent builder for constructing an [`AdmissionGate`].
///
/// At minimum, a primary [`CounterStore`] must be supplied. All other fields
/// have sensible defaults (default tier policies, no exempt prefixes, a
/// fresh health monitor and metrics set).
pub struct GateBuilder {
    policies: PolicyTable,
    primary: Option<Arc<dyn CounterStore>>,
    health: Option<Arc<BackendHealth>>,
    exempt_prefixes: Vec<String>,
    metrics: Option<Arc<GateMetrics>>,
}

impl GateBuilder {
    /// Create a new builder with all optional fields set to their defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            policies: PolicyTable::default(),
            primary: None,
            health: None,
            exempt_prefixes: Vec::new(),
            metrics: None,
        }
    }

    /// Set the tier policy table.
    #[must_use]
    pub fn policies(mut self, policies: PolicyTable) -> Self {
        self.policies = policies;
        self
    }

    /// Set the shared (primary) counter store.
    #[must_use]
    pub fn primary(mut self, store: Arc<dyn CounterStore>) -> Self {
        self.primary = Some(store);
        self
    }

    /// Share a health monitor with other components (e.g. the quota ledger).
    #[must_use]
    pub fn health(mut self, health: Arc<BackendHealth>) -> Self {
        self.health = Some(health);
        self
    }

    /// Add one exempt path prefix.
    #[must_use]
    pub fn exempt_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.exempt_prefixes.push(prefix.into());
        self
    }

    /// Replace the exempt path prefixes.
    #[must_use]
    pub fn exempt_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.exempt_prefixes = prefixes;
        self
    }

    /// Share a metrics set with other components.
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<GateMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the gate.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Configuration`] if no primary store was supplied.
    pub fn build(self) -> Result<AdmissionGate, GateError> {
        let primary = self.primary.ok_or_else(|| {
            GateError::Configuration("a primary counter store is required".into())
        })?;
        let health = self.health.unwrap_or_default();
        let metrics = self.metrics.unwrap_or_default();

        Ok(AdmissionGate::new(
            self.policies,
            primary,
            health,
            self.exempt_prefixes,
            metrics,
        ))
    }
}

impl Default for GateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
