//! Session lifecycle management.
//!
//! ```text
//!  ┌──────────────┐   resolve/reset/is_live   ┌────────────────┐
//!  │ Orchestrator │──────────────────────────▶│  SessionStore  │
//!  └──────────────┘                           │ (key → record) │
//!                                             └───────▲────────┘
//!  ┌────────────────┐   evict_expired                 │
//!  │ CleanupSweeper │─────────────────────────────────┘
//!  └────────────────┘   (periodic, advisory)
//! ```
//!
//! - **SessionStore**: owns all session state and the locking discipline;
//!   liveness checks are self-sufficient.
//! - **CleanupSweeper**: bounds worst-case memory by periodically evicting
//!   records the access path never revisits. Never a correctness mechanism.

mod store;
mod sweeper;

pub use store::{
    SessionRecord, SessionStore, StoreStats, TtlPolicy, DEFAULT_TTL_MINUTES, SESSION_ID_PREFIX,
};
pub use sweeper::{CleanupSweeper, DEFAULT_SWEEP_INTERVAL};

// ============================================================================
// Session Key
// ============================================================================

/// Identity key for one conversation: a (tenant, user) pair.
///
/// Tenant and user are kept as separate fields, so keys can never collide
/// across tenants regardless of what characters the IDs contain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    tenant_id: String,
    user_id: String,
}

impl SessionKey {
    pub fn new(tenant_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.tenant_id, self.user_id)
    }
}
