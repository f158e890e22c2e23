//! Request orchestration façade.
//!
//! The only entry point the surrounding layers (HTTP controller, UI) call.
//! Each request is independent: validate, optionally reset, resolve the
//! session, query the backend, translate. Session bookkeeping is
//! deliberately independent of the NLU outcome; a failed turn neither
//! resets nor expires the session.

use std::sync::Arc;

use reqwest::Client;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::nlu::{translate, ContextParams, FailureKind, NluBackend, NluError, NluGateway};
use crate::session::{SessionKey, SessionStore};

// ============================================================================
// Public Error Taxonomy
// ============================================================================

/// Caller-visible failures of the façade.
///
/// `ServiceUnavailable` and `Internal` carry fixed user-safe messages;
/// backend detail goes to the log only (credential failures in particular
/// must not leak to end users).
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed caller input. Never retried; the caller must fix the
    /// request.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The NLU backend is unreachable, rate-limited, or misconfigured.
    /// Retryable by the user.
    #[error("the assistant is currently unavailable, please try again later")]
    ServiceUnavailable,

    /// Anything else.
    #[error("something went wrong while processing the message")]
    Internal,
}

// ============================================================================
// Request / Reply Types
// ============================================================================

/// One inbound conversation turn.
#[derive(Debug, Clone, Default)]
pub struct MessageRequest {
    pub user_id: String,
    pub tenant_id: String,
    pub text: String,
    /// Scalar context values forwarded to the backend. Non-scalar entries
    /// are dropped, not rejected.
    pub context_params: ContextParams,
    /// Per-request language override; falls back to the configured
    /// default.
    pub language: Option<String>,
    /// Discard any existing session before resolving, guaranteeing a
    /// fresh conversation.
    pub reset_session: bool,
}

/// Translated outcome of one conversation turn.
#[derive(Debug, Clone)]
pub struct MessageReply {
    pub session_id: String,
    pub response_text: String,
    pub intent_name: String,
    pub confidence: f64,
    pub parameters: serde_json::Map<String, serde_json::Value>,
    pub structured_payloads: Vec<serde_json::Value>,
}

/// Infallible observability snapshot.
#[derive(Debug, Clone, Copy)]
pub struct HealthStats {
    pub active_session_count: usize,
    pub idle_ttl_minutes: i64,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Façade over the session store and the NLU backend.
///
/// Constructed once at process start with its dependencies injected; no
/// hidden global state, so tests build one per case around a scripted
/// backend.
pub struct Orchestrator {
    store: Arc<SessionStore>,
    backend: Arc<dyn NluBackend>,
}

impl Orchestrator {
    pub fn new(store: Arc<SessionStore>, backend: Arc<dyn NluBackend>) -> Self {
        Self { store, backend }
    }

    /// Wire a store and a reqwest gateway from configuration.
    pub fn from_config(config: &Config) -> Result<Self, NluError> {
        let client = Client::builder()
            .timeout(config.nlu.request_timeout())
            .build()?;
        let gateway = NluGateway::new(client, config.nlu.settings(), config.nlu.auth());
        let store = Arc::new(SessionStore::new(config.sessions.ttl_policy()));
        Ok(Self::new(store, Arc::new(gateway)))
    }

    /// The session store this orchestrator resolves against. Exposed so
    /// the owning process can attach a [`crate::session::CleanupSweeper`].
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Run one conversation turn.
    ///
    /// Validation failures short-circuit before any session or network
    /// work.
    pub async fn send_message(&self, request: MessageRequest) -> Result<MessageReply, CoreError> {
        let key = identity_key(&request.user_id, &request.tenant_id)?;
        let text = request.text.trim();
        if text.is_empty() {
            return Err(CoreError::Validation(
                "message text must not be empty".to_string(),
            ));
        }

        if request.reset_session {
            self.store.reset(&key);
        }
        let session_id = self.store.resolve(&key);

        let result = self
            .backend
            .query(
                &session_id,
                text,
                &request.context_params,
                request.language.as_deref(),
            )
            .await
            .map_err(|e| map_backend_error(e, &session_id))?;

        let reply = translate(result);
        debug!(
            session_id = %session_id,
            intent = %reply.intent_name,
            confidence = reply.confidence,
            "Turn complete"
        );

        Ok(MessageReply {
            session_id,
            response_text: reply.fulfillment_text,
            intent_name: reply.intent_name,
            confidence: reply.confidence,
            parameters: reply.parameters,
            structured_payloads: reply.structured_payloads,
        })
    }

    /// Drop any session for the given identity. Idempotent.
    pub fn reset_session(&self, user_id: &str, tenant_id: &str) -> Result<(), CoreError> {
        let key = identity_key(user_id, tenant_id)?;
        self.store.reset(&key);
        Ok(())
    }

    /// Snapshot for health endpoints. Never fails.
    pub fn health_stats(&self) -> HealthStats {
        let stats = self.store.stats();
        HealthStats {
            active_session_count: stats.count,
            idle_ttl_minutes: stats.ttl_idle.num_minutes(),
        }
    }
}

fn identity_key(user_id: &str, tenant_id: &str) -> Result<SessionKey, CoreError> {
    if user_id.trim().is_empty() || tenant_id.trim().is_empty() {
        return Err(CoreError::Validation(
            "user and tenant identity are required".to_string(),
        ));
    }
    Ok(SessionKey::new(tenant_id, user_id))
}

/// 1:1 mapping from gateway failure kinds to the public taxonomy.
fn map_backend_error(err: NluError, session_id: &str) -> CoreError {
    match err.kind() {
        FailureKind::Validation => CoreError::Validation(err.to_string()),
        FailureKind::PermissionDenied => {
            // Deployment/config defect, not user error. Detail stays in
            // the log.
            error!(
                session_id = %session_id,
                error = %err,
                "NLU backend rejected credentials or configuration"
            );
            CoreError::ServiceUnavailable
        }
        FailureKind::Unavailable => {
            warn!(session_id = %session_id, error = %err, "NLU backend unavailable");
            CoreError::ServiceUnavailable
        }
        FailureKind::Unknown => {
            warn!(session_id = %session_id, error = %err, "NLU query failed");
            CoreError::Internal
        }
    }
}
