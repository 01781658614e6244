pub mod caller;
pub mod decision;
pub mod key;
pub mod policy;
pub mod quota;
pub mod tier;

pub use caller::{CallerContext, CallerId};
pub use decision::{AdmissionDecision, LimitType, QuotaDecision};
pub use key::{Granularity, WindowKey};
pub use policy::{PolicyTable, TierPolicy};
pub use quota::{FeatureQuotas, QuotaKey, day_bucket, next_utc_midnight};
pub use tier::Tier;
