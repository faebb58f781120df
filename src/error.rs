use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector store '{}' does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("Vector store '{}' has 0 length", .0.display())]
    EmptyFile(PathBuf),

    #[error("Corrupt vector store: {0}")]
    CorruptFormat(String),

    #[error("Embedding provider failed: {0}")]
    ProviderFailure(String),

    #[error("Failed to extract text from '{}': {reason}", path.display())]
    ExtractionFailure { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Missing or empty stores mean "nothing to search", not a crash.
    pub fn is_missing_store(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::EmptyFile(_))
    }
}
