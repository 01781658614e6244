use thiserror::Error;

/// Errors that can occur while assembling the engine from configuration.
///
/// These exist only at startup; once the engine is built, nothing on the
/// request path returns an error.
#[derive(Debug, Error)]
pub enum SetupError {
    /// A configuration value was invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// A counter-store backend could not be constructed.
    #[error("state error: {0}")]
    State(#[from] tollgate_state::StateError),

    /// The admission gate could not be built.
    #[error("gate error: {0}")]
    Gate(#[from] tollgate_gate::GateError),
}
