//! Scoped temporary files for handing uploaded bytes to an extractor.

use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::trace;

/// Uploaded bytes staged in a temporary file.
///
/// The file is removed when the value is dropped, whichever way the
/// extraction that used it ended.
pub struct StagedDocument {
    file: NamedTempFile,
}

impl StagedDocument {
    /// Write `bytes` to a fresh temporary file that keeps the extension of
    /// `filename` (services use it to detect the format).
    pub fn stage(filename: &str, bytes: &[u8]) -> io::Result<Self> {
        let suffix = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_else(|| ".pdf".to_string());

        let mut file = tempfile::Builder::new()
            .prefix("invex-")
            .suffix(&suffix)
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        trace!("Staged {} ({} bytes) at {}", filename, bytes.len(), file.path().display());
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
