use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use tollgate_core::FeatureQuotas;
use tollgate_gate::{AdmissionGate, BackendHealth, GateMetrics, QuotaLedger};
use tollgate_state::CounterStore;
use tollgate_state_memory::MemoryCounterStore;
use tollgate_state_redis::{RedisConfig, RedisCounterStore};

use crate::config::{StateConfig, TollgateConfig};
use crate::error::SetupError;

/// The assembled admission engine: gate, ledger, and the quota table the
/// host resolves feature limits from.
pub struct Engine {
    pub gate: Arc<AdmissionGate>,
    pub ledger: Arc<QuotaLedger>,
    pub quotas: FeatureQuotas,
}

/// Create the counter-store backend selected by configuration.
///
/// # Errors
///
/// Returns [`SetupError::Config`] for an unknown backend name and
/// [`SetupError::State`] if the backend cannot be constructed.
pub fn create_counter_store(config: &StateConfig) -> Result<Arc<dyn CounterStore>, SetupError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryCounterStore::new())),
        "redis" => {
            let redis_config = RedisConfig {
                url: config
                    .url
                    .clone()
                    .unwrap_or_else(|| RedisConfig::default().url),
                prefix: config
                    .prefix
                    .clone()
                    .unwrap_or_else(|| RedisConfig::default().prefix),
                pool_size: config.pool_size,
                connection_timeout: Duration::from_millis(config.connection_timeout_ms),
                operation_timeout: Duration::from_millis(config.operation_timeout_ms),
            };
            let store = RedisCounterStore::new(&redis_config)?;
            Ok(Arc::new(store))
        }
        other => Err(SetupError::Config(format!(
            "unknown state backend: {other}"
        ))),
    }
}

/// Assemble gate and ledger from configuration and run the eager startup
/// probe against the shared backend.
///
/// # Errors
///
/// Returns a [`SetupError`] if the backend or the gate cannot be built; a
/// failing probe is not an error (the engine starts in fallback mode).
pub async fn build_engine(config: &TollgateConfig) -> Result<Engine, SetupError> {
    let store = create_counter_store(&config.state)?;
    let health = Arc::new(BackendHealth::new());
    let metrics = Arc::new(GateMetrics::default());

    let gate = AdmissionGate::builder()
        .policies(config.limits.clone())
        .primary(Arc::clone(&store))
        .health(Arc::clone(&health))
        .metrics(Arc::clone(&metrics))
        .exempt_prefixes(config.exempt_paths.clone())
        .build()?;
    let gate = Arc::new(gate);

    let available = gate.probe_backend().await;
    info!(
        backend = %config.state.backend,
        available,
        "admission engine initialized"
    );

    let ledger = Arc::new(QuotaLedger::new(store, health, metrics));

    Ok(Engine {
        gate,
        ledger,
        quotas: config.quotas.clone(),
    })
}
