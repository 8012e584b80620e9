//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Environment variable holding the document parsing service key.
pub const PARSER_API_KEY_ENV: &str = "LLAMA_CLOUD_API_KEY";

/// Environment variable holding the language model service key.
pub const MODEL_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Main configuration for the invex pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvexConfig {
    /// Document text extraction configuration.
    pub parser: ParserConfig,

    /// Field extraction model configuration.
    pub model: ModelConfig,

    /// Export configuration.
    pub export: ExportConfig,
}

/// Which document-text extractor to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractorKind {
    /// Hosted LlamaParse service.
    #[default]
    LlamaParse,
    /// Offline extraction of embedded PDF text.
    Local,
}

impl ExtractorKind {
    /// Whether this extractor needs the parsing service key.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, ExtractorKind::LlamaParse)
    }
}

/// Document parsing service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Extractor backend.
    pub backend: ExtractorKind,

    /// Base URL of the parsing API.
    pub endpoint: String,

    /// Result format requested from the service.
    pub result_type: String,

    /// Delay between job status polls, in milliseconds.
    pub poll_interval_ms: u64,

    /// Give up on a parsing job after this many seconds.
    pub timeout_secs: u64,

    /// Timeout for each HTTP request to the service, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            backend: ExtractorKind::LlamaParse,
            endpoint: "https://api.cloud.llamaindex.ai/api/parsing".to_string(),
            result_type: "markdown".to_string(),
            poll_interval_ms: 1000,
            timeout_secs: 300,
            request_timeout_secs: 120,
        }
    }
}

/// Language model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of the generative language API.
    pub endpoint: String,

    /// Model identifier.
    pub model: String,

    /// Sampling temperature (service default when unset).
    pub temperature: Option<f32>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Retries for rate-limited or 5xx responses.
    pub max_retries: u32,

    /// Initial backoff between retries, in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            temperature: None,
            timeout_secs: 120,
            max_retries: 2,
            retry_delay_ms: 750,
        }
    }
}

/// Export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory for export files.
    pub output_dir: PathBuf,

    /// Worksheet name for the full export.
    pub sheet_name: String,

    /// File name prefix for the full export.
    pub full_prefix: String,

    /// File name prefix for the successful-only export.
    pub successful_prefix: String,

    /// Add a summary worksheet to the spreadsheet export.
    pub summary_sheet: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            sheet_name: "Invoices".to_string(),
            full_prefix: "invoices_summary".to_string(),
            successful_prefix: "invoices_successful".to_string(),
            summary_sheet: true,
        }
    }
}

impl InvexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Invalid(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| ConfigError::Invalid(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| ConfigError::Invalid(format!("{}: {}", path.display(), e)))
    }
}

/// API keys for the external services, resolved once at startup.
#[derive(Clone)]
pub struct Credentials {
    parser_api_key: Option<String>,
    model_api_key: String,
}

impl Credentials {
    pub fn new(parser_api_key: Option<String>, model_api_key: impl Into<String>) -> Self {
        Self {
            parser_api_key,
            model_api_key: model_api_key.into(),
        }
    }

    /// Read the keys required by `backend` from the process environment.
    pub fn from_env(backend: ExtractorKind) -> Result<Self, ConfigError> {
        Self::from_lookup(backend, |name| std::env::var(name).ok())
    }

    /// Resolve keys through `lookup`. Empty values count as missing.
    pub fn from_lookup<F>(backend: ExtractorKind, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let parser_api_key = if backend.requires_api_key() {
            Some(get(PARSER_API_KEY_ENV).ok_or(ConfigError::MissingSecret(PARSER_API_KEY_ENV))?)
        } else {
            get(PARSER_API_KEY_ENV)
        };
        let model_api_key =
            get(MODEL_API_KEY_ENV).ok_or(ConfigError::MissingSecret(MODEL_API_KEY_ENV))?;

        Ok(Self {
            parser_api_key,
            model_api_key,
        })
    }

    pub fn parser_api_key(&self) -> Option<&str> {
        self.parser_api_key.as_deref()
    }

    pub fn model_api_key(&self) -> &str {
        &self.model_api_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("parser_api_key", &self.parser_api_key.as_ref().map(|_| "***"))
            .field("model_api_key", &"***")
            .finish()
    }
}
