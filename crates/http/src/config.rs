use serde::Deserialize;

use tollgate_core::{FeatureQuotas, PolicyTable};

/// Schema for `tollgate.toml`.
#[derive(Debug, Deserialize)]
pub struct TollgateConfig {
    /// Counter-store backend configuration.
    #[serde(default)]
    pub state: StateConfig,

    /// Ordered path prefixes that bypass admission control entirely.
    #[serde(default = "default_exempt_paths")]
    pub exempt_paths: Vec<String>,

    /// Per-tier limit overrides; tiers not listed keep their defaults.
    #[serde(default)]
    pub limits: PolicyTable,

    /// Per-tier daily limits for metered features.
    #[serde(default)]
    pub quotas: FeatureQuotas,
}

impl Default for TollgateConfig {
    fn default() -> Self {
        Self {
            state: StateConfig::default(),
            exempt_paths: default_exempt_paths(),
            limits: PolicyTable::default(),
            quotas: FeatureQuotas::default(),
        }
    }
}

impl TollgateConfig {
    /// Parse a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns the underlying TOML error for malformed input.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

/// Configuration for the counter-store backend.
#[derive(Debug, Deserialize)]
pub struct StateConfig {
    /// Which backend to use: `"memory"` or `"redis"`.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Connection URL for the backend (e.g. `redis://localhost:6379`).
    pub url: Option<String>,

    /// Key prefix for backends that support it. Defaults to `"tollgate"`.
    pub prefix: Option<String>,

    /// Number of pooled connections.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Timeout for acquiring a pooled connection, in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// Timeout for one counting round trip, in milliseconds.
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: None,
            prefix: None,
            pool_size: default_pool_size(),
            connection_timeout_ms: default_connection_timeout_ms(),
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }
}

fn default_backend() -> String {
    "memory".to_owned()
}

fn default_pool_size() -> usize {
    10
}

fn default_connection_timeout_ms() -> u64 {
    5_000
}

fn default_operation_timeout_ms() -> u64 {
    250
}

fn default_exempt_paths() -> Vec<String> {
    vec!["/health".to_owned()]
}
