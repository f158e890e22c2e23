//! Wire types for the NLU backend's detect-intent API.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Context parameters attached to a query: string keys mapped to scalar
/// values. Non-scalar values are dropped at encoding time, not rejected.
pub type ContextParams = HashMap<String, Value>;

// ============================================================================
// Request
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DetectIntentRequest {
    pub query_input: QueryInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_params: Option<QueryParams>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryInput {
    pub text: TextInput,
    pub language_code: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TextInput {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct QueryParams {
    pub parameters: serde_json::Map<String, Value>,
}

// ============================================================================
// Response
// ============================================================================

/// Top-level detect-intent response envelope.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct DetectIntentResponse {
    pub query_result: Option<QueryResult>,
}

/// Raw query result as returned by the backend.
///
/// Every field is optional on the wire; absent fields deserialize to their
/// defaults so one missing segment never fails the whole turn.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryResult {
    /// Response segments in backend order. Text and structured payloads
    /// are interleaved.
    pub response_messages: Vec<ResponseMessage>,
    /// Best-matched intent, if any.
    pub intent: Option<IntentMatch>,
    /// Confidence for the matched intent, in [0, 1].
    pub intent_detection_confidence: Option<f64>,
    /// Slot/entity values extracted during the turn. Opaque to this core.
    pub parameters: Option<Value>,
}

/// One response segment: either text or an opaque structured payload.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponseMessage {
    pub text: Option<TextSegments>,
    pub payload: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TextSegments {
    pub text: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct IntentMatch {
    pub display_name: Option<String>,
}
