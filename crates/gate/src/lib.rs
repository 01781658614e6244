pub mod builder;
pub mod error;
pub mod gate;
pub mod health;
pub mod ledger;
pub mod metrics;

pub use builder::GateBuilder;
pub use error::GateError;
pub use gate::{AdmissionGate, RequestContext};
pub use health::BackendHealth;
pub use ledger::QuotaLedger;
pub use metrics::{GateMetrics, MetricsSnapshot};
