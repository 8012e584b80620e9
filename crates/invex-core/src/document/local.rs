//! Offline text extraction from PDFs with embedded text, using lopdf and
//! pdf-extract.

use std::path::Path;

use async_trait::async_trait;
use lopdf::Document;
use tracing::debug;

use super::{DocumentTextExtractor, Result};
use crate::error::DocumentError;

/// Extracts the embedded text layer of a PDF without any network calls.
///
/// Scanned documents without a text layer yield empty text.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalPdfExtractor;

impl LocalPdfExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract text from in-memory PDF bytes.
    pub fn extract_from_bytes(data: &[u8]) -> Result<String> {
        let mut doc = Document::load_mem(data)
            .map_err(|e| DocumentError::UnsupportedFormat(format!("failed to parse PDF: {}", e)))?;

        // pdf-extract cannot open encrypted files, so re-save decrypted bytes
        let decrypted;
        let raw: &[u8] = if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(DocumentError::UnsupportedFormat("PDF is encrypted".to_string()));
            }
            debug!("Decrypted PDF with empty password");

            let mut buffer = Vec::new();
            doc.save_to(&mut buffer).map_err(|e| {
                DocumentError::UnsupportedFormat(format!("failed to save decrypted PDF: {}", e))
            })?;
            decrypted = buffer;
            &decrypted
        } else {
            data
        };

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(DocumentError::UnsupportedFormat("PDF has no pages".to_string()));
        }

        let text = pdf_extract::extract_text_from_mem(raw)
            .map_err(|e| DocumentError::UnsupportedFormat(format!("failed to extract text: {}", e)))?;

        debug!("Extracted {} characters from {} pages", text.len(), page_count);
        Ok(text)
    }
}

#[async_trait]
impl DocumentTextExtractor for LocalPdfExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| DocumentError::Transport(format!("failed to read staged document: {}", e)))?;

        tokio::task::spawn_blocking(move || Self::extract_from_bytes(&data))
            .await
            .map_err(|e| DocumentError::Transport(format!("text extraction task failed: {}", e)))?
    }
}
