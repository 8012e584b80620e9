//! Error types for the invex-core library.

use thiserror::Error;

/// Main error type for the invex library.
///
/// Stage errors are transparent so that the message recorded on a failed
/// invoice row is the stage's own message.
#[derive(Error, Debug)]
pub enum InvexError {
    /// Document text extraction error.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Field extraction (language model) error.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Model response could not be turned into a record.
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Export error.
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Longest excerpt of a service response quoted in an error message.
pub(crate) const MAX_DETAIL_CHARS: usize = 500;

/// Trim a service response body down to an excerpt fit for an error message.
pub(crate) fn service_detail(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_DETAIL_CHARS) {
        Some((cut, _)) => format!("{}… ({} bytes total)", &body[..cut], body.len()),
        None => body.to_string(),
    }
}

/// Errors from the document-text extractor.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Network or service failure.
    #[error("{0}")]
    Transport(String),

    /// The service could not handle the document.
    #[error("unsupported document: {0}")]
    UnsupportedFormat(String),

    /// Extraction produced no usable text.
    #[error("no text content found")]
    NoTextContent,
}

/// Errors from the field extraction client.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Network or service failure.
    #[error("{0}")]
    Transport(String),

    /// The service rejected the call for quota or rate reasons.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
}

/// Errors turning a model response into an invoice record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    /// Nothing left to decode once fences were removed.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The sanitized text is not valid JSON.
    #[error("JSON parsing error: {0}")]
    Decode(String),

    /// The decoded value is valid JSON but not an object.
    #[error("validation error: {0}")]
    Validation(String),
}

/// Startup configuration errors. These are fatal and never per-file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required secret is absent from the environment.
    #[error("missing required secret {0}; set it in the environment or a .env file")]
    MissingSecret(&'static str),

    /// The configuration file could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// An HTTP client could not be built from the configuration.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Errors writing export files.
#[derive(Error, Debug)]
pub enum ExportError {
    /// CSV serialization failed.
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    /// Spreadsheet serialization failed.
    #[error("spreadsheet export failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Writing the export to disk failed.
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the invex library.
pub type Result<T> = std::result::Result<T, InvexError>;
