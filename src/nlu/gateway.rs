//! Stateless client for the NLU backend's detect-intent endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::error::NluError;
use super::types::{
    ContextParams, DetectIntentRequest, DetectIntentResponse, QueryInput, QueryParams, QueryResult,
    TextInput,
};

/// Default language for queries that carry no override.
pub const DEFAULT_LANGUAGE: &str = "en";

// ============================================================================
// Backend Trait
// ============================================================================

/// Trait seam for the NLU backend, so the orchestrator can be exercised
/// against a scripted backend in tests.
#[async_trait]
pub trait NluBackend: Send + Sync {
    /// Run one detect-intent turn for the given session.
    ///
    /// Exactly one attempt per call; retry policy, if any, belongs to the
    /// caller.
    async fn query(
        &self,
        session_id: &str,
        text: &str,
        context: &ContextParams,
        language: Option<&str>,
    ) -> Result<QueryResult, NluError>;
}

// ============================================================================
// Gateway Settings
// ============================================================================

/// Authentication mode for the NLU backend.
pub enum NluAuth {
    /// OAuth bearer token.
    Bearer(String),
    /// Static API key header.
    ApiKey(String),
}

/// Process-wide backend addressing, loaded once at startup.
#[derive(Debug, Clone)]
pub struct NluSettings {
    /// Tenant project identifier.
    pub project: String,
    /// Region/location the agent is deployed in.
    pub location: String,
    /// Agent identifier within the project.
    pub agent: String,
    /// Language used when a query carries no override.
    pub default_language: String,
    /// Backend base URL, no trailing slash required.
    pub base_url: String,
}

// ============================================================================
// Gateway
// ============================================================================

/// Reqwest-backed [`NluBackend`].
///
/// Holds no per-session state: the session ID is just a path segment. The
/// request timeout lives on the injected `Client`.
pub struct NluGateway {
    client: Client,
    settings: NluSettings,
    auth: Option<NluAuth>,
}

impl NluGateway {
    #[must_use]
    pub fn new(client: Client, settings: NluSettings, auth: Option<NluAuth>) -> Self {
        Self {
            client,
            settings,
            auth,
        }
    }

    /// Backend-addressable path for one session.
    fn session_path(&self, session_id: &str) -> String {
        format!(
            "projects/{}/locations/{}/agents/{}/sessions/{}",
            self.settings.project, self.settings.location, self.settings.agent, session_id
        )
    }

    fn detect_intent_url(&self, session_id: &str) -> String {
        format!(
            "{}/v3/{}:detectIntent",
            self.settings.base_url.trim_end_matches('/'),
            self.session_path(session_id)
        )
    }

    /// Build a POST request with the configured auth headers.
    fn build_request(&self, url: &str, body: &DetectIntentRequest) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .post(url)
            .header("Content-Type", "application/json");

        match &self.auth {
            Some(NluAuth::Bearer(token)) => {
                builder = builder.header("Authorization", format!("Bearer {}", token));
            }
            Some(NluAuth::ApiKey(key)) => {
                builder = builder.header("x-api-key", key);
            }
            None => {}
        }

        builder.json(body)
    }
}

/// Keep only scalar-valued entries; null, arrays, and objects are not
/// supported parameter types and are omitted rather than erroring.
fn scalar_parameters(context: &ContextParams) -> serde_json::Map<String, Value> {
    let mut parameters = serde_json::Map::new();
    for (key, value) in context {
        match value {
            Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                parameters.insert(key.clone(), value.clone());
            }
            _ => {
                debug!(parameter = %key, "Dropping non-scalar context parameter");
            }
        }
    }
    parameters
}

#[async_trait]
impl NluBackend for NluGateway {
    async fn query(
        &self,
        session_id: &str,
        text: &str,
        context: &ContextParams,
        language: Option<&str>,
    ) -> Result<QueryResult, NluError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(NluError::EmptyQuery);
        }

        let parameters = scalar_parameters(context);
        let request = DetectIntentRequest {
            query_input: QueryInput {
                text: TextInput {
                    text: text.to_string(),
                },
                language_code: language
                    .unwrap_or(self.settings.default_language.as_str())
                    .to_string(),
            },
            query_params: if parameters.is_empty() {
                None
            } else {
                Some(QueryParams { parameters })
            },
        };

        let url = self.detect_intent_url(session_id);
        debug!(session_id = %session_id, "Querying NLU backend");

        let response = self.build_request(&url, &request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(NluError::Backend { status, message });
        }

        let body: DetectIntentResponse = response.json().await?;
        Ok(body.query_result.unwrap_or_default())
    }
}
