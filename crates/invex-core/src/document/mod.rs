//! Document-text extraction: turning a staged PDF into text.

mod llama_parse;
#[cfg(feature = "local-pdf")]
mod local;
mod staging;

pub use llama_parse::LlamaParseExtractor;
#[cfg(feature = "local-pdf")]
pub use local::LocalPdfExtractor;
pub use staging::StagedDocument;

use std::path::Path;

use async_trait::async_trait;

use crate::error::{ConfigError, DocumentError};
use crate::models::config::{Credentials, ExtractorKind, ParserConfig, PARSER_API_KEY_ENV};

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, DocumentError>;

/// A service that extracts text content from a PDF on disk.
#[async_trait]
pub trait DocumentTextExtractor: Send + Sync {
    /// Extract the text of the document at `path`.
    ///
    /// An empty string is a valid answer; the caller decides whether it is
    /// usable.
    async fn extract(&self, path: &Path) -> Result<String>;
}

#[async_trait]
impl<T: DocumentTextExtractor + ?Sized> DocumentTextExtractor for Box<T> {
    async fn extract(&self, path: &Path) -> Result<String> {
        (**self).extract(path).await
    }
}

/// Build the extractor selected by `config`.
pub fn build_extractor(
    config: &ParserConfig,
    credentials: &Credentials,
) -> std::result::Result<Box<dyn DocumentTextExtractor>, ConfigError> {
    match config.backend {
        ExtractorKind::LlamaParse => {
            let api_key = credentials
                .parser_api_key()
                .ok_or(ConfigError::MissingSecret(PARSER_API_KEY_ENV))?;
            Ok(Box::new(LlamaParseExtractor::new(config, api_key)?))
        }
        #[cfg(feature = "local-pdf")]
        ExtractorKind::Local => Ok(Box::new(LocalPdfExtractor::new())),
        #[cfg(not(feature = "local-pdf"))]
        ExtractorKind::Local => Err(ConfigError::Invalid(
            "local extraction requires the `local-pdf` feature".to_string(),
        )),
    }
}
