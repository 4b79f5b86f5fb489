use serde::{Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("File is empty")]
    EmptyFile,
    #[error("Unable to parse file: {0}")]
    UnparsableFile(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Storage error: {0}")]
    StorageFailure(String),
    #[error("Analysis error: {0}")]
    AnalysisFailure(String),
    #[error("Schema definition missing: {0}")]
    SchemaMissing(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Faults caused by the caller's input rather than by the service.
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            AppError::UnsupportedFileType(_)
                | AppError::EmptyFile
                | AppError::UnparsableFile(_)
                | AppError::NotFound(_)
                | AppError::InvalidRequest(_)
        )
    }
}

// Errors cross the HTTP boundary as their display text.
impl Serialize for AppError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
