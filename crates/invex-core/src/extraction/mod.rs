//! Field extraction: querying the language model and turning its answer into
//! an invoice record.

mod gemini;
pub mod normalize;
mod patterns;
pub mod prompt;
pub mod sanitize;

pub use gemini::GeminiClient;
pub use normalize::{normalize_record, parse_amount};
pub use prompt::SCHEMA_PROMPT;
pub use sanitize::sanitize_response;

use async_trait::async_trait;

use crate::error::ModelError;

/// Result type for model calls.
pub type Result<T> = std::result::Result<T, ModelError>;

/// A language model service that answers a schema prompt about a document.
#[async_trait]
pub trait FieldExtractionClient: Send + Sync {
    /// Ask for the fields described by `schema_prompt` in `text`. The reply is
    /// free-form text expected to contain one JSON object.
    async fn query(&self, text: &str, schema_prompt: &str) -> Result<String>;
}

#[async_trait]
impl<T: FieldExtractionClient + ?Sized> FieldExtractionClient for Box<T> {
    async fn query(&self, text: &str, schema_prompt: &str) -> Result<String> {
        (**self).query(text, schema_prompt).await
    }
}
