use std::collections::HashMap;

use chrono::{DateTime, Days, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::caller::CallerId;
use crate::tier::Tier;

/// Per-tier daily limits for metered features.
///
/// Unknown feature names resolve to a limit of `0` (feature disabled), the
/// same fail-restrictive default as unknown tiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureQuotas {
    per_tier: HashMap<Tier, HashMap<String, u32>>,
}

impl FeatureQuotas {
    /// Build from an explicit `(tier, feature) -> daily_limit` mapping.
    #[must_use]
    pub fn new(per_tier: HashMap<Tier, HashMap<String, u32>>) -> Self {
        Self { per_tier }
    }

    /// The daily limit for a feature at a tier; `0` when unconfigured.
    #[must_use]
    pub fn daily_limit(&self, tier: Tier, feature: &str) -> u32 {
        match self.per_tier.get(&tier).and_then(|m| m.get(feature)) {
            Some(limit) => *limit,
            None => {
                debug!(%tier, feature, "no quota configured, feature disabled");
                0
            }
        }
    }
}

/// The UTC calendar-day bucket for a quota counter, formatted `YYYYMMDD`.
#[must_use]
pub fn day_bucket(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d").to_string()
}

/// The next UTC midnight after `now`, when a fresh day bucket begins.
#[must_use]
pub fn next_utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .checked_add_days(Days::new(1))
        .map_or(now, |next| next.and_time(NaiveTime::MIN).and_utc())
}

/// Key addressing one caller's daily counter for one metered feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuotaKey {
    pub caller: CallerId,
    pub feature: String,
    pub bucket: String,
}

impl QuotaKey {
    /// Build the day-bucketed key for a consumption at `now`.
    #[must_use]
    pub fn new(caller: &CallerId, feature: &str, now: DateTime<Utc>) -> Self {
        Self {
            caller: caller.clone(),
            feature: feature.to_owned(),
            bucket: day_bucket(now),
        }
    }

    /// Return a canonical string representation:
    /// `quota:feature:caller:bucket`.
    #[must_use]
    pub fn canonical(&self) -> String {
        format!("quota:{}:{}:{}", self.feature, self.caller, self.bucket)
    }
}

impl std::fmt::Display for QuotaKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}
