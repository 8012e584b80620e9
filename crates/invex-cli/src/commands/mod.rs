//! CLI commands.

pub mod config;
pub mod convert;
pub mod process;

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use tracing::debug;

use invex_core::models::config::{Credentials, ExtractorKind, InvexConfig};
use invex_core::{BatchOrchestrator, DocumentTextExtractor, GeminiClient, build_extractor};

/// Text extraction backend, as chosen on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ExtractorArg {
    /// LlamaParse document service
    LlamaParse,
    /// Offline PDF text extraction
    Local,
}

impl From<ExtractorArg> for ExtractorKind {
    fn from(arg: ExtractorArg) -> Self {
        match arg {
            ExtractorArg::LlamaParse => ExtractorKind::LlamaParse,
            ExtractorArg::Local => ExtractorKind::Local,
        }
    }
}

pub type Orchestrator = BatchOrchestrator<Box<dyn DocumentTextExtractor>, GeminiClient>;

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("invex")
        .join("config.json")
}

/// The explicit config file, else the default file when it exists, else
/// built-in defaults.
pub fn load_config(config_path: Option<&Path>) -> anyhow::Result<InvexConfig> {
    if let Some(path) = config_path {
        return Ok(InvexConfig::from_file(path)?);
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Loading configuration from {}", path.display());
        Ok(InvexConfig::from_file(&path)?)
    } else {
        Ok(InvexConfig::default())
    }
}

/// Read the secrets for `config` and build the pipeline. Fails before any
/// document is touched when a secret is missing.
pub fn build_orchestrator(config: &InvexConfig) -> anyhow::Result<Orchestrator> {
    let credentials = Credentials::from_env(config.parser.backend)?;
    let extractor = build_extractor(&config.parser, &credentials)?;
    let client = GeminiClient::new(&config.model, credentials.model_api_key())?;
    Ok(BatchOrchestrator::new(extractor, client))
}
