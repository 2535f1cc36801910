// Error taxonomy for the rationalization pipeline.
//
// Failures are isolated to the smallest unit that can fail: a document that
// can't be read becomes a DocumentExtractionError and contributes zero
// paragraphs, while configuration problems stop an operation before any work
// starts. Cache evictions are never errors, only log lines.

use std::path::PathBuf;

use thiserror::Error;

/// A single document could not be turned into page text.
///
/// Non-fatal: the pipeline logs it and carries on with the other documents.
#[derive(Debug, Clone, Error)]
#[error("failed to extract text from {}: {reason}", path.display())]
pub struct DocumentExtractionError {
    pub path: PathBuf,
    pub reason: String,
}

impl DocumentExtractionError {
    pub fn new(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Missing or invalid input for an operation. Always surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("input folder not set")]
    MissingInput,

    #[error("input folder {} does not exist", .0.display())]
    InputNotFound(PathBuf),

    #[error("{} is not a folder", .0.display())]
    InputNotDirectory(PathBuf),

    #[error("no supported documents (.pdf, .txt) found in {}", .0.display())]
    NoDocuments(PathBuf),

    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Anything that aborts a whole operation.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("could not start worker pool: {0}")]
    WorkerPool(String),

    #[error("background job failed: {0}")]
    Job(String),
}
