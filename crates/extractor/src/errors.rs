//! Extractor error types

use gazette_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("PDF parse error for {path}: {message}")]
    PdfParse { path: String, message: String },

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] AppError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ExtractionError> for AppError {
    fn from(e: ExtractionError) -> Self {
        match e {
            ExtractionError::Store(inner) => inner,
            ExtractionError::PdfParse { .. } | ExtractionError::UnsupportedFile(_) => {
                AppError::InvalidFormat { message: e.to_string() }
            }
            ExtractionError::FileNotFound(path) => AppError::NotFound {
                resource_type: "file".to_string(),
                id: path,
            },
            ExtractionError::Io(io) => io.into(),
        }
    }
}

/// Why a single notice could not be turned into a record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NoticeError {
    #[error("no subject name found")]
    MissingName,

    #[error("unrecognised layout: {0}")]
    UnrecognisedLayout(String),
}
