//! Normalization of raw backend results into the public reply shape.

use serde_json::Value;

use super::types::QueryResult;

/// Reply text when the backend produced no text segments at all.
pub const FALLBACK_FULFILLMENT: &str = "I could not understand that. Please try again.";

/// Sentinel intent name when the backend matched nothing.
pub const UNKNOWN_INTENT: &str = "Unknown";

/// Normalized result of one conversation turn.
#[derive(Debug, Clone)]
pub struct NluReply {
    /// All text segments, newline-joined in backend order.
    pub fulfillment_text: String,
    /// Matched intent label, or [`UNKNOWN_INTENT`].
    pub intent_name: String,
    /// Intent confidence in [0, 1]; 0 when absent.
    pub confidence: f64,
    /// Non-text payload segments, passed through opaquely in order.
    pub structured_payloads: Vec<Value>,
    /// Slot/entity values extracted by the backend, passed through
    /// opaquely.
    pub parameters: serde_json::Map<String, Value>,
}

/// Translate a raw backend result into an [`NluReply`].
pub fn translate(result: QueryResult) -> NluReply {
    let mut segments: Vec<String> = Vec::new();
    let mut structured_payloads = Vec::new();

    for message in result.response_messages {
        if let Some(text) = message.text {
            segments.extend(text.text.into_iter().filter(|s| !s.is_empty()));
        }
        if let Some(payload) = message.payload {
            structured_payloads.push(payload);
        }
    }

    let fulfillment_text = if segments.is_empty() {
        FALLBACK_FULFILLMENT.to_string()
    } else {
        segments.join("\n")
    };

    let intent_name = result
        .intent
        .and_then(|intent| intent.display_name)
        .unwrap_or_else(|| UNKNOWN_INTENT.to_string());

    let confidence = result
        .intent_detection_confidence
        .unwrap_or(0.0)
        .clamp(0.0, 1.0);

    let parameters = match result.parameters {
        Some(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };

    NluReply {
        fulfillment_text,
        intent_name,
        confidence,
        structured_payloads,
        parameters,
    }
}
