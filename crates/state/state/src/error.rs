use thiserror::Error;

/// Errors from counter-store operations.
///
/// Every variant is treated as "backend unavailable" by the admission gate;
/// none of them ever reaches the caller of `admit` or `consume`.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}
