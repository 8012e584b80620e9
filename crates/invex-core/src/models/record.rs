//! Invoice records produced by the extraction pipeline.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Names of the extracted fields, in export column order.
pub const FIELD_NAMES: [&str; 10] = [
    "date",
    "invoice_number",
    "party_name",
    "party_address",
    "trn",
    "currency",
    "subtotal",
    "tax_amount",
    "net_total",
    "items_count",
];

/// Fields extracted from a single invoice. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InvoiceFields {
    /// Invoice date, as reported by the model (expected `YYYY-MM-DD`).
    pub date: Option<String>,

    /// Invoice or bill number.
    pub invoice_number: Option<String>,

    /// Vendor/supplier name.
    pub party_name: Option<String>,

    /// Vendor address.
    pub party_address: Option<String>,

    /// Tax registration number (TRN/VAT/TIN).
    pub trn: Option<String>,

    /// Currency code (USD, EUR, AED, ...).
    pub currency: Option<String>,

    /// Amount before tax.
    #[serde(with = "rust_decimal::serde::float_option")]
    pub subtotal: Option<Decimal>,

    /// Total tax amount.
    #[serde(with = "rust_decimal::serde::float_option")]
    pub tax_amount: Option<Decimal>,

    /// Final amount including tax.
    #[serde(with = "rust_decimal::serde::float_option")]
    pub net_total: Option<Decimal>,

    /// Number of line items.
    pub items_count: Option<u32>,
}

impl InvoiceFields {
    /// Number of fields that carry a value.
    pub fn present_count(&self) -> usize {
        [
            self.date.is_some(),
            self.invoice_number.is_some(),
            self.party_name.is_some(),
            self.party_address.is_some(),
            self.trn.is_some(),
            self.currency.is_some(),
            self.subtotal.is_some(),
            self.tax_amount.is_some(),
            self.net_total.is_some(),
            self.items_count.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }
}

/// Terminal processing status of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Success,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Success => "success",
            ProcessingStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of processing one file.
///
/// A failed outcome holds no extracted fields, so stale or partial values
/// cannot survive a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(InvoiceFields),
    Failed { error_message: String },
}

/// Structured result for one input file.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceRecord {
    source_file: String,
    outcome: Outcome,
}

impl InvoiceRecord {
    /// Create a successful record.
    pub fn success(source_file: impl Into<String>, fields: InvoiceFields) -> Self {
        Self {
            source_file: source_file.into(),
            outcome: Outcome::Success(fields),
        }
    }

    /// Create a failed record. An empty message is replaced so that failed
    /// rows always explain themselves.
    pub fn failed(source_file: impl Into<String>, error_message: impl Into<String>) -> Self {
        let mut error_message = error_message.into();
        if error_message.trim().is_empty() {
            error_message = "unknown error".to_string();
        }
        Self {
            source_file: source_file.into(),
            outcome: Outcome::Failed { error_message },
        }
    }

    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn status(&self) -> ProcessingStatus {
        match self.outcome {
            Outcome::Success(_) => ProcessingStatus::Success,
            Outcome::Failed { .. } => ProcessingStatus::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    /// Extracted fields, present only for successful records.
    pub fn fields(&self) -> Option<&InvoiceFields> {
        match &self.outcome {
            Outcome::Success(fields) => Some(fields),
            Outcome::Failed { .. } => None,
        }
    }

    /// Error message, present only for failed records.
    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failed { error_message } => Some(error_message),
        }
    }
}

/// Flat view used for JSON output: extracted fields followed by provenance.
#[derive(Serialize)]
struct FlatRecord<'a> {
    #[serde(flatten)]
    fields: &'a InvoiceFields,
    source_file: &'a str,
    processing_status: ProcessingStatus,
    error_message: Option<&'a str>,
}

impl Serialize for InvoiceRecord {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let empty = InvoiceFields::default();
        FlatRecord {
            fields: self.fields().unwrap_or(&empty),
            source_file: &self.source_file,
            processing_status: self.status(),
            error_message: self.error_message(),
        }
        .serialize(serializer)
    }
}
