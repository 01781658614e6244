use sha2::{Digest, Sha256};

/// Caller context supplied by the identity collaborator, as a tagged variant
/// rather than optional-attribute probing.
///
/// `tier` stays a raw string here: tier resolution (including the
/// unknown-tier fallback) belongs to [`PolicyTable`](crate::PolicyTable).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallerContext {
    /// A caller with a resolved identity.
    Authenticated {
        id: String,
        /// Tier name as reported upstream; `None` when the collaborator
        /// omitted it.
        tier: Option<String>,
    },
    /// An unauthenticated caller, identified by network origin and client
    /// signature.
    Anonymous { ip: String, user_agent: String },
}

impl CallerContext {
    /// The raw tier string, if the caller carries one.
    #[must_use]
    pub fn tier_raw(&self) -> Option<&str> {
        match self {
            Self::Authenticated { tier, .. } => tier.as_deref(),
            Self::Anonymous { .. } => None,
        }
    }
}

/// Stable identity used as the counting-key component for one caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallerId {
    /// Authenticated caller, keyed by upstream id.
    User(String),
    /// Anonymous caller, keyed by a hash of its network origin and client
    /// signature. Hashing bounds key cardinality and keeps raw client
    /// metadata out of storage keys.
    Client(String),
}

impl CallerId {
    /// Derive the counting identity for a caller context.
    #[must_use]
    pub fn from_context(ctx: &CallerContext) -> Self {
        match ctx {
            CallerContext::Authenticated { id, .. } => Self::User(id.clone()),
            CallerContext::Anonymous { ip, user_agent } => {
                Self::Client(stable_client_hash(ip, user_agent))
            }
        }
    }
}

impl std::fmt::Display for CallerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Client(hash) => write!(f, "client:{hash}"),
        }
    }
}

/// Hash an anonymous caller's origin into a short fixed-width token.
fn stable_client_hash(ip: &str, user_agent: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ip.as_bytes());
    hasher.update(b"\n");
    hasher.update(user_agent.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}
