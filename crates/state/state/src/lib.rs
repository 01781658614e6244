pub mod error;
pub mod store;
pub mod testing;

pub use error::StateError;
pub use store::{
    BackendProbe, CounterStore, QuotaCounter, WindowCounter, WindowDecision, decision_from_count,
};
