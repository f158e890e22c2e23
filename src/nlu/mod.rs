//! NLU backend client: request construction, transport, and result
//! normalization.

mod error;
mod gateway;
mod translate;
mod types;

pub use error::{FailureKind, NluError};
pub use gateway::{NluAuth, NluBackend, NluGateway, NluSettings, DEFAULT_LANGUAGE};
pub use translate::{translate, NluReply, FALLBACK_FULFILLMENT, UNKNOWN_INTENT};
pub use types::{ContextParams, IntentMatch, QueryResult, ResponseMessage, TextSegments};
