pub mod backend;
pub mod config;
pub mod error;
pub mod middleware;
pub mod response;
pub mod telemetry;

pub use backend::{Engine, build_engine, create_counter_store};
pub use config::{StateConfig, TollgateConfig};
pub use error::SetupError;
pub use middleware::{AdmissionLayer, AdmissionService};
pub use response::{annotate_response, quota_exhausted, too_many_requests};
