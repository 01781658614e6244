use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::caller::CallerId;

/// A trailing time window over which request events are counted.
///
/// [`Granularity::ALL`] lists the windows smallest first, which is the
/// evaluation order used by the admission gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Minute,
    Hour,
    Day,
}

impl Granularity {
    /// All granularities, smallest window first.
    pub const ALL: [Self; 3] = [Self::Minute, Self::Hour, Self::Day];

    /// The window length.
    #[must_use]
    pub fn window(&self) -> Duration {
        match self {
            Self::Minute => Duration::from_secs(60),
            Self::Hour => Duration::from_secs(3_600),
            Self::Day => Duration::from_secs(86_400),
        }
    }

    /// Return the canonical lowercase label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key addressing one caller's counter for one window granularity.
///
/// The same caller within the same granularity always renders to the same
/// key; the minute-window key differs from the hour-window key for the same
/// caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowKey {
    pub caller: CallerId,
    pub granularity: Granularity,
}

impl WindowKey {
    /// Build a window key for the given caller and granularity.
    #[must_use]
    pub fn new(caller: CallerId, granularity: Granularity) -> Self {
        Self {
            caller,
            granularity,
        }
    }

    /// Return a canonical string representation: `rl:granularity:caller`.
    #[must_use]
    pub fn canonical(&self) -> String {
        format!("rl:{}:{}", self.granularity, self.caller)
    }
}

impl std::fmt::Display for WindowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}
