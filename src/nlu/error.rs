//! NLU gateway error types and failure classification.

use thiserror::Error;

/// Errors that can occur when querying the NLU backend.
#[derive(Debug, Error)]
pub enum NluError {
    /// Query text was empty after trimming. Nothing was sent to the
    /// backend.
    #[error("query text must not be empty")]
    EmptyQuery,

    /// HTTP request failed before a response was produced.
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Backend returned an error response.
    #[error("backend error (status {status}): {message}")]
    Backend { status: u16, message: String },
}

/// Caller-visible classification of a gateway failure.
///
/// Backend-specific status families collapse into three kinds so the
/// orchestrator stays independent of any particular backend's numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Malformed caller input; never retried.
    Validation,
    /// Backend rejected credentials or configuration.
    PermissionDenied,
    /// Transient outage, rate limiting, or timeout.
    Unavailable,
    /// Anything else.
    Unknown,
}

impl NluError {
    /// Classify this error into the fixed failure table.
    pub fn kind(&self) -> FailureKind {
        match self {
            NluError::EmptyQuery => FailureKind::Validation,
            NluError::Request(e) if e.is_timeout() || e.is_connect() => FailureKind::Unavailable,
            NluError::Request(_) => FailureKind::Unknown,
            NluError::Backend { status, message } => classify_backend(*status, message),
        }
    }
}

/// Fixed mapping from backend status codes to failure kinds.
///
/// The HTTP status family decides first; the body is consulted for the
/// backend's canonical status strings when the HTTP code alone is
/// ambiguous (some deployments tunnel everything through 400/500).
fn classify_backend(status: u16, message: &str) -> FailureKind {
    match status {
        401 | 403 => FailureKind::PermissionDenied,
        408 | 429 | 502 | 503 | 504 => FailureKind::Unavailable,
        _ if message.contains("PERMISSION_DENIED") || message.contains("UNAUTHENTICATED") => {
            FailureKind::PermissionDenied
        }
        _ if message.contains("UNAVAILABLE")
            || message.contains("RESOURCE_EXHAUSTED")
            || message.contains("DEADLINE_EXCEEDED") =>
        {
            FailureKind::Unavailable
        }
        _ => FailureKind::Unknown,
    }
}
