//! Core library for batch invoice field extraction.
//!
//! This crate provides:
//! - Document text extraction (LlamaParse service or local PDF parsing)
//! - Field extraction through a Gemini model with a fixed schema prompt
//! - Response sanitizing and normalization into typed invoice records
//! - Sequential batch orchestration with per-file failure isolation
//! - Summary statistics and spreadsheet/CSV exports

pub mod document;
pub mod error;
pub mod extraction;
pub mod models;
pub mod pipeline;
pub mod report;

pub use document::{DocumentTextExtractor, LlamaParseExtractor, build_extractor};
#[cfg(feature = "local-pdf")]
pub use document::LocalPdfExtractor;
pub use error::{
    ConfigError, DocumentError, ExportError, InvexError, ModelError, ResponseError, Result,
};
pub use extraction::{FieldExtractionClient, GeminiClient, SCHEMA_PROMPT};
pub use models::batch::BatchResult;
pub use models::config::{Credentials, ExtractorKind, InvexConfig};
pub use models::record::{InvoiceFields, InvoiceRecord, Outcome, ProcessingStatus};
pub use pipeline::{BatchOrchestrator, InputDocument, NoProgress, ProgressObserver};
pub use report::{ExportFormat, ExportPaths, SummaryStatistics, write_exports};
