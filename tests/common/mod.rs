//! Common test utilities.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use parley::nlu::{
    ContextParams, IntentMatch, NluBackend, NluError, QueryResult, ResponseMessage, TextSegments,
};
use parley::{Orchestrator, SessionStore, TtlPolicy};

/// One recorded backend call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub session_id: String,
    pub text: String,
    pub context: ContextParams,
    pub language: Option<String>,
}

/// Backend double with scripted outcomes and call recording.
///
/// Outcomes are consumed in order; once the script runs dry, every call
/// returns an empty result.
pub struct ScriptedBackend {
    outcomes: Mutex<VecDeque<Result<QueryResult, NluError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, outcome: Result<QueryResult, NluError>) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl NluBackend for ScriptedBackend {
    async fn query(
        &self,
        session_id: &str,
        text: &str,
        context: &ContextParams,
        language: Option<&str>,
    ) -> Result<QueryResult, NluError> {
        self.calls.lock().unwrap().push(RecordedCall {
            session_id: session_id.to_string(),
            text: text.to_string(),
            context: context.clone(),
            language: language.map(|l| l.to_string()),
        });

        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(QueryResult::default()))
    }
}

/// Orchestrator over a fresh store with default TTLs and the given
/// backend.
pub fn test_orchestrator(backend: Arc<ScriptedBackend>) -> Orchestrator {
    Orchestrator::new(Arc::new(SessionStore::new(TtlPolicy::default())), backend)
}

/// A result with one text segment and a matched intent.
pub fn text_result(text: &str, intent: &str, confidence: f64) -> QueryResult {
    QueryResult {
        response_messages: vec![ResponseMessage {
            text: Some(TextSegments {
                text: vec![text.to_string()],
            }),
            payload: None,
        }],
        intent: Some(IntentMatch {
            display_name: Some(intent.to_string()),
        }),
        intent_detection_confidence: Some(confidence),
        parameters: None,
    }
}

/// A backend error with the given HTTP status.
pub fn backend_error(status: u16, message: &str) -> NluError {
    NluError::Backend {
        status,
        message: message.to_string(),
    }
}
