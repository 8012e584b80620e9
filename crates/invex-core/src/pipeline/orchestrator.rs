//! Drives the per-file pipeline across a batch.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures_util::FutureExt;
use tracing::{Instrument, debug, info, info_span, warn};

use super::{InputDocument, ProgressObserver};
use crate::document::{DocumentTextExtractor, StagedDocument};
use crate::error::{DocumentError, Result};
use crate::extraction::{FieldExtractionClient, SCHEMA_PROMPT, normalize_record, sanitize_response};
use crate::models::batch::BatchResult;
use crate::models::record::InvoiceRecord;

/// Runs extract → query → sanitize → normalize for each document.
///
/// Files are processed one at a time in input order. A failure in any stage
/// of one file becomes a failed record for that file and never stops the
/// batch.
pub struct BatchOrchestrator<D, M> {
    extractor: D,
    client: M,
    schema_prompt: String,
}

impl<D, M> BatchOrchestrator<D, M>
where
    D: DocumentTextExtractor,
    M: FieldExtractionClient,
{
    pub fn new(extractor: D, client: M) -> Self {
        Self {
            extractor,
            client,
            schema_prompt: SCHEMA_PROMPT.to_string(),
        }
    }

    /// Replace the schema prompt sent with every document.
    pub fn with_schema_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.schema_prompt = prompt.into();
        self
    }

    pub fn extractor(&self) -> &D {
        &self.extractor
    }

    pub fn client(&self) -> &M {
        &self.client
    }

    /// Process every document and return exactly one record per input, in
    /// input order.
    pub async fn process_batch<P>(&self, inputs: &[InputDocument], progress: &P) -> BatchResult
    where
        P: ProgressObserver + ?Sized,
    {
        let start = Instant::now();
        let total = inputs.len();
        let mut batch = BatchResult::with_capacity(total);

        info!("Processing batch of {} files", total);

        for (i, input) in inputs.iter().enumerate() {
            let record = self.process_file(input).await;
            batch.push(record);
            progress.file_completed(i + 1, total, &input.filename);
        }

        info!(
            "Batch finished in {}ms: {} successful, {} failed",
            start.elapsed().as_millis(),
            batch.successful().count(),
            batch.failed().count()
        );
        batch
    }

    /// Process one document. Never fails: errors become a failed record.
    pub async fn process_file(&self, input: &InputDocument) -> InvoiceRecord {
        let span = info_span!("file", name = %input.filename);
        let outcome = AssertUnwindSafe(self.run_stages(input).instrument(span))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(record)) => {
                debug!("{} processed successfully", input.filename);
                record
            }
            Ok(Err(e)) => {
                warn!("Failed to process {}: {}", input.filename, e);
                InvoiceRecord::failed(&input.filename, e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!("Processing {} panicked: {}", input.filename, message);
                InvoiceRecord::failed(&input.filename, format!("internal error: {}", message))
            }
        }
    }

    async fn run_stages(&self, input: &InputDocument) -> Result<InvoiceRecord> {
        // The staged file lives only for the extractor call
        let text = {
            let staged = StagedDocument::stage(&input.filename, &input.bytes)?;
            self.extractor.extract(staged.path()).await?
        };

        if text.trim().is_empty() {
            return Err(DocumentError::NoTextContent.into());
        }
        debug!("Extracted {} characters of text", text.len());

        let response = self.client.query(&text, &self.schema_prompt).await?;
        let sanitized = sanitize_response(&response)?;
        let record = normalize_record(&sanitized, &input.filename)?;

        Ok(record)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
