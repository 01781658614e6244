use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::key::Granularity;
use crate::tier::Tier;

/// Which limit produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitType {
    Minute,
    Hour,
    Day,
    Quota,
}

impl LimitType {
    /// Return the canonical lowercase label used in denial bodies.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Quota => "quota",
        }
    }
}

impl From<Granularity> for LimitType {
    fn from(granularity: Granularity) -> Self {
        match granularity {
            Granularity::Minute => Self::Minute,
            Granularity::Hour => Self::Hour,
            Granularity::Day => Self::Day,
        }
    }
}

impl std::fmt::Display for LimitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an admission check. Pure value, returned synchronously and
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// The limit that applied. `0` means no limit was evaluated (exempt
    /// paths and fail-open), and no advisory headers should be emitted.
    pub limit: u32,
    /// Remaining requests in the applied window.
    pub remaining: u32,
    /// When the applied window resets.
    pub reset_at: DateTime<Utc>,
    /// Throttling hint on denial, in seconds.
    pub retry_after: Option<u64>,
    /// Which granularity (or quota) produced this decision.
    pub limit_type: LimitType,
    /// Resolved subscription tier of the caller.
    pub tier: Tier,
}

impl AdmissionDecision {
    /// An always-allow decision that advertises no limits.
    ///
    /// Used for exempt paths and for the fail-open boundary.
    #[must_use]
    pub fn unlimited(tier: Tier) -> Self {
        Self {
            allowed: true,
            limit: 0,
            remaining: 0,
            reset_at: Utc::now(),
            retry_after: None,
            limit_type: LimitType::Minute,
            tier,
        }
    }

    /// Whether this decision carries meaningful limit/remaining values.
    #[must_use]
    pub fn is_advisory(&self) -> bool {
        self.limit > 0
    }
}

/// Outcome of a quota consumption attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaDecision {
    /// Whether the consumption fits within the daily limit.
    pub allowed: bool,
    /// Consumptions counted so far today, including this one.
    pub used: u64,
    /// Consumptions left today.
    pub remaining: u64,
    /// When the day bucket rolls over (next UTC midnight).
    pub reset_at: DateTime<Utc>,
}
