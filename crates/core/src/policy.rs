use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::key::Granularity;
use crate::tier::Tier;

/// Limit parameters for one subscription tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPolicy {
    /// Requests admitted per trailing minute window.
    pub requests_per_minute: u32,
    /// Requests admitted per trailing hour window. `0` disables the check.
    #[serde(default)]
    pub requests_per_hour: u32,
    /// Requests admitted per trailing day window. `0` disables the check.
    #[serde(default)]
    pub requests_per_day: u32,
    /// Extra headroom applied on top of the minute limit.
    #[serde(default)]
    pub burst_allowance: u32,
}

impl TierPolicy {
    /// The effective limit for one granularity.
    ///
    /// The burst allowance widens only the minute window; a return of `0`
    /// means the granularity is not checked for this tier.
    #[must_use]
    pub fn limit_for(&self, granularity: Granularity) -> u32 {
        match granularity {
            Granularity::Minute => self.requests_per_minute.saturating_add(self.burst_allowance),
            Granularity::Hour => self.requests_per_hour,
            Granularity::Day => self.requests_per_day,
        }
    }
}

/// Immutable mapping from subscription tier to limit parameters.
///
/// Loaded once at startup; one entry per tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTable {
    #[serde(default = "default_free")]
    pub free: TierPolicy,
    #[serde(default = "default_mid")]
    pub mid: TierPolicy,
    #[serde(default = "default_top")]
    pub top: TierPolicy,
    #[serde(default = "default_admin")]
    pub admin: TierPolicy,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            free: default_free(),
            mid: default_mid(),
            top: default_top(),
            admin: default_admin(),
        }
    }
}

impl PolicyTable {
    /// Look up the policy for a known tier.
    #[must_use]
    pub fn policy(&self, tier: Tier) -> &TierPolicy {
        match tier {
            Tier::Free => &self.free,
            Tier::Mid => &self.mid,
            Tier::Top => &self.top,
            Tier::Admin => &self.admin,
        }
    }

    /// Resolve an upstream tier value to a tier and its policy.
    ///
    /// Total over the input domain: unknown or missing tiers resolve to the
    /// [`Tier::Free`] policy, so an unrecognized tier never grants elevated
    /// throughput.
    #[must_use]
    pub fn resolve(&self, raw: Option<&str>) -> (Tier, &TierPolicy) {
        let tier = match raw {
            Some(value) => Tier::parse(value).unwrap_or_else(|| {
                debug!(tier = %value, "unknown tier, resolving to free");
                Tier::Free
            }),
            None => {
                debug!("caller carries no tier, resolving to free");
                Tier::Free
            }
        };
        (tier, self.policy(tier))
    }
}

fn default_free() -> TierPolicy {
    TierPolicy {
        requests_per_minute: 10,
        requests_per_hour: 200,
        requests_per_day: 1_000,
        burst_allowance: 5,
    }
}

fn default_mid() -> TierPolicy {
    TierPolicy {
        requests_per_minute: 60,
        requests_per_hour: 2_000,
        requests_per_day: 20_000,
        burst_allowance: 20,
    }
}

fn default_top() -> TierPolicy {
    TierPolicy {
        requests_per_minute: 300,
        requests_per_hour: 10_000,
        requests_per_day: 100_000,
        burst_allowance: 50,
    }
}

fn default_admin() -> TierPolicy {
    TierPolicy {
        requests_per_minute: 1_000,
        requests_per_hour: 50_000,
        requests_per_day: 500_000,
        burst_allowance: 100,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tier_resolves_to_free() {
        let table = PolicyTable::default();
        let (tier, policy) = table.resolve(Some("platinum"));
        assert_eq!(tier, Tier::Free);
        assert_eq!(policy, &table.free);
    }

    #[test]
    fn missing_tier_resolves_to_free() {
        let table = PolicyTable::default();
        let (tier, policy) = table.resolve(None);
        assert_eq!(tier, Tier::Free);
        assert_eq!(policy, &table.free);
    }

    #[test]
    fn known_tiers_resolve_to_their_policies() {
        let table = PolicyTable::default();
        for (raw, tier) in [
            ("free", Tier::Free),
            ("mid", Tier::Mid),
            ("top", Tier::Top),
            ("admin", Tier::Admin),
        ] {
            let (resolved, policy) = table.resolve(Some(raw));
            assert_eq!(resolved, tier);
            assert_eq!(policy, table.policy(tier));
        }
    }

    #[test]
    fn burst_widens_only_the_minute_window() {
        let policy = TierPolicy {
            requests_per_minute: 10,
            requests_per_hour: 100,
            requests_per_day: 500,
            burst_allowance: 5,
        };
        assert_eq!(policy.limit_for(Granularity::Minute), 15);
        assert_eq!(policy.limit_for(Granularity::Hour), 100);
        assert_eq!(policy.limit_for(Granularity::Day), 500);
    }

    #[test]
    fn higher_tiers_never_tighten_limits() {
        let table = PolicyTable::default();
        for granularity in Granularity::ALL {
            let mut previous = 0;
            for tier in [Tier::Free, Tier::Mid, Tier::Top, Tier::Admin] {
                let limit = table.policy(tier).limit_for(granularity);
                assert!(limit >= previous, "{tier} tightens {granularity}");
                previous = limit;
            }
        }
    }

    #[test]
    fn partial_policy_deserializes_with_zero_defaults() {
        let policy: TierPolicy =
            serde_json::from_str(r#"{"requests_per_minute": 25}"#).unwrap();
        assert_eq!(policy.requests_per_minute, 25);
        assert_eq!(policy.requests_per_hour, 0);
        assert_eq!(policy.limit_for(Granularity::Hour), 0);
    }
}
