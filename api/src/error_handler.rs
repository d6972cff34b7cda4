use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use blob_store::BlobError;
use report_pipeline::PipelineError;
use thiserror::Error;
use tracing::{error, warn};

use crate::core::{
    app_state::ConfigError,
    http::response_envelope::{ApiErrorDetail, ApiResponse},
};

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request ---
    #[error("{field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("report {0} not found")]
    NotFound(String),

    /// Error mapped from lower layers with a specific status and code.
    #[error("{message}")]
    Http {
        status: StatusCode,
        code: &'static str,
        message: String,
    },
}

impl AppError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Http { status, .. } => *status,
            AppError::Config(_) | AppError::Bind(_) | AppError::Server(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Bind(_) => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::Validation { .. } => "VALIDATION_FAILED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Http { code, .. } => code,
        }
    }

    fn details(&self) -> Vec<ApiErrorDetail> {
        match self {
            AppError::Validation { field, reason } => {
                vec![ApiErrorDetail::field(field.clone(), reason.clone())]
            }
            _ => Vec::new(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.error_code(), error = %self, "request failed");
        } else {
            warn!(code = self.error_code(), %status, error = %self, "request rejected");
        }
        ApiResponse::<()>::error(self.error_code(), self.to_string(), self.details())
            .into_response_with_status(status)
    }
}

/// Result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Http {
            status: err.status(),
            code: "UPLOAD_FAILED",
            message: format!("could not read multipart body: {}", err.body_text()),
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::NotFound { id } => AppError::NotFound(id),
            PipelineError::Validation(v) => AppError::validation(v.field, v.reason),
            PipelineError::TooManyFiles { max, got } => AppError::Http {
                status: StatusCode::BAD_REQUEST,
                code: "TOO_MANY_FILES",
                message: format!("at most {max} files per request, got {got}"),
            },
            PipelineError::UnsupportedFile(kind) => AppError::Http {
                status: StatusCode::BAD_REQUEST,
                code: "UNSUPPORTED_FILE",
                message: format!("unsupported file type {kind}; allowed: pdf, jpg, jpeg, png"),
            },
            PipelineError::Intake(e) => AppError::Http {
                status: match e {
                    BlobError::Io(_) | BlobError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    _ => StatusCode::BAD_GATEWAY,
                },
                code: "UPLOAD_FAILED",
                message: format!("file upload failed: {e}"),
            },
            PipelineError::Persistence(e) => AppError::Http {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "STORAGE_FAILED",
                message: format!("report storage failed: {e}"),
            },
            PipelineError::Config(msg) => AppError::Http {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "CONFIG_ERROR",
                message: msg,
            },
        }
    }
}
