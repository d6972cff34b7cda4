use std::{env, sync::Arc};

use ai_llm_service::{AiLlmError, LlmService, config::default_config::config_from_env};
use blob_store::{
    BlobError, BlobStore, CloudinaryBlobStore, CloudinaryConfig, LocalBlobStore, MemoryBlobStore,
};
use report_pipeline::{
    OcrError, OcrSpaceClient, OcrSpaceConfig, PipelineConfig, PipelineError, ReportPipeline,
};
use report_store::{MemoryReportStore, ReportStore, SqliteReportStore, StoreError};
use thiserror::Error;
use tracing::info;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Start-up failures while wiring the service from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("unknown {var} backend: {value}")]
    UnknownBackend { var: &'static str, value: String },

    #[error(transparent)]
    Llm(#[from] AiLlmError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Request-size limits enforced at the HTTP edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_files: usize,
    pub max_body_bytes: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_files: 5,
            max_body_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ReportPipeline>,
    pub limits: UploadLimits,
}

impl AppState {
    pub fn new(pipeline: Arc<ReportPipeline>, limits: UploadLimits) -> Self {
        Self { pipeline, limits }
    }

    /// Builds every collaborator from environment variables.
    ///
    /// - `BLOB_STORE`: `local` (default, `BLOB_LOCAL_DIR`), `memory`, `cloudinary`
    /// - `REPORT_STORE`: `memory` (default) or `sqlite` (`REPORT_DB_PATH`)
    /// - `MAX_UPLOAD_BYTES`: request body limit, default 20 MiB
    ///
    /// LLM, OCR and pipeline knobs are read by their own crates.
    pub async fn from_env() -> Result<Self, ConfigError> {
        let cfg = PipelineConfig::from_env()?;

        let llm_cfg = config_from_env()?;
        info!(provider = %llm_cfg.provider, model = %llm_cfg.model, "text generation backend");
        let generator = Arc::new(LlmService::new(llm_cfg));

        let ocr = Arc::new(OcrSpaceClient::new(OcrSpaceConfig::from_env(cfg.ocr_timeout))?);

        let blob_kind = env_or("BLOB_STORE", "local").to_ascii_lowercase();
        let blobs: Arc<dyn BlobStore> = match blob_kind.as_str() {
            "memory" => Arc::new(MemoryBlobStore::new()),
            "local" => Arc::new(LocalBlobStore::open(env_or("BLOB_LOCAL_DIR", "./uploads")).await?),
            "cloudinary" => Arc::new(CloudinaryBlobStore::new(CloudinaryConfig::from_env(
                cfg.fetch_timeout,
            )?)?),
            other => {
                return Err(ConfigError::UnknownBackend {
                    var: "BLOB_STORE",
                    value: other.to_owned(),
                });
            }
        };

        let store_kind = env_or("REPORT_STORE", "memory").to_ascii_lowercase();
        let store: Arc<dyn ReportStore> = match store_kind.as_str() {
            "memory" => Arc::new(MemoryReportStore::new()),
            "sqlite" => Arc::new(SqliteReportStore::open(env_or("REPORT_DB_PATH", "reports.db"))?),
            other => {
                return Err(ConfigError::UnknownBackend {
                    var: "REPORT_STORE",
                    value: other.to_owned(),
                });
            }
        };
        info!(blob_store = %blob_kind, report_store = %store_kind, "storage backends");

        let limits = UploadLimits {
            max_files: cfg.max_files_per_upload,
            max_body_bytes: max_upload_bytes()?,
        };

        let pipeline = ReportPipeline::new(generator, ocr, blobs, store, cfg);
        Ok(Self::new(Arc::new(pipeline), limits))
    }
}

fn env_or(k: &str, dflt: &str) -> String {
    env::var(k)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| dflt.to_string())
}

fn max_upload_bytes() -> Result<usize, ConfigError> {
    match env::var("MAX_UPLOAD_BYTES") {
        Ok(v) if !v.trim().is_empty() => v.trim().parse().map_err(|_| ConfigError::Invalid {
            var: "MAX_UPLOAD_BYTES",
            reason: format!("expected a byte count, got {v:?}"),
        }),
        _ => Ok(DEFAULT_MAX_UPLOAD_BYTES),
    }
}
