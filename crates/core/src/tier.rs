use serde::{Deserialize, Serialize};

/// A caller's subscription level.
///
/// The derived ordering follows the declaration order, so
/// `Free < Mid < Top < Admin` holds for hierarchy checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Free,
    Mid,
    Top,
    Admin,
}

impl Tier {
    /// Parse a tier name as supplied by the identity collaborator.
    ///
    /// Returns `None` for unknown or malformed values; callers that need a
    /// total mapping go through [`PolicyTable::resolve`](crate::PolicyTable::resolve),
    /// which falls back to [`Tier::Free`].
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "free" => Some(Self::Free),
            "mid" => Some(Self::Mid),
            "top" => Some(Self::Top),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Return the canonical lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Mid => "mid",
            Self::Top => "top",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
