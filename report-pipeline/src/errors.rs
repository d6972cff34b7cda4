//! Error types for the report pipeline.
//!
//! Only intake and persistence failures reach callers as [`PipelineError`].
//! Extraction, OCR and generation failures are logged and degraded inside the
//! pipeline; [`OcrError`] never leaves the extractor.

use std::time::Duration;

use blob_store::BlobError;
use report_store::{StoreError, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Blob store rejected an upload; nothing was recorded.
    #[error("upload failed: {0}")]
    Intake(#[from] BlobError),

    #[error("storage failed: {0}")]
    Persistence(#[from] StoreError),

    #[error("invalid report: {0}")]
    Validation(#[from] ValidationError),

    #[error("report {id} not found")]
    NotFound { id: String },

    #[error("too many files: at most {max} per request, got {got}")]
    TooManyFiles { max: usize, got: usize },

    /// Upload whose type is not PDF, JPEG or PNG.
    #[error("unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("pipeline configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub(crate) fn not_found(id: &str) -> Self {
        PipelineError::NotFound { id: id.to_owned() }
    }
}

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("OCR service returned {status}: {snippet}")]
    HttpStatus { status: u16, snippet: String },

    #[error("OCR response could not be decoded: {0}")]
    Decode(String),

    /// The engine processed the request and reported a failure.
    #[error("OCR engine error: {0}")]
    Engine(String),

    #[error("OCR API key is not configured")]
    MissingApiKey,

    #[error("OCR timed out after {0:?}")]
    Timeout(Duration),
}
