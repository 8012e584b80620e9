//! Batch pipeline: one record per uploaded document, in upload order.

mod orchestrator;

pub use orchestrator::BatchOrchestrator;

use std::path::Path;

/// One uploaded document.
#[derive(Debug, Clone)]
pub struct InputDocument {
    /// Original file name, carried onto the record.
    pub filename: String,
    /// Raw PDF bytes.
    pub bytes: Vec<u8>,
}

impl InputDocument {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Read a document from disk, naming it after the file.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { filename, bytes })
    }
}

/// Receives a notification after each file finishes, successfully or not.
pub trait ProgressObserver {
    /// `index` is 1-based: the `index`-th of `total` files named `filename`
    /// has been processed.
    fn file_completed(&self, index: usize, total: usize, filename: &str);
}

impl<F> ProgressObserver for F
where
    F: Fn(usize, usize, &str),
{
    fn file_completed(&self, index: usize, total: usize, filename: &str) {
        self(index, total, filename)
    }
}

/// Observer that ignores progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn file_completed(&self, _index: usize, _total: usize, _filename: &str) {}
}
