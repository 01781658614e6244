use thiserror::Error;

/// Errors that can occur inside the admission engine.
///
/// These never cross the `admit`/`consume` boundary: the gate converts every
/// internal fault into an allow-and-continue decision.
#[derive(Debug, Error)]
pub enum GateError {
    /// An error occurred in a counter store.
    #[error("state error: {0}")]
    State(#[from] tollgate_state::StateError),

    /// The gate was misconfigured (e.g. missing required components).
    #[error("configuration error: {0}")]
    Configuration(String),
}
