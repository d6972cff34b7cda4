//! Lab report ingestion and analysis pipeline.
//!
//! ```text
//! uploads ─▶ BlobStore ─▶ ReportFile[0] ─▶ TextExtractor ─▶ AnalysisGenerator ─▶ (Translator) ─▶ ReportStore
//! ```
//!
//! [`ReportPipeline`] is the entry point. It is built once with injected
//! collaborators ([`TextGenerator`](ai_llm_service::TextGenerator),
//! [`OcrBackend`], [`BlobStore`](blob_store::BlobStore),
//! [`ReportStore`](report_store::ReportStore)) and shared behind an `Arc`.

pub mod analysis;
pub mod config;
pub mod errors;
pub mod extractor;
pub mod ocr;
pub mod orchestrator;
pub mod prompt;
pub mod record_manager;
pub mod translator;

#[cfg(test)]
pub(crate) mod test_support;

pub use analysis::{
    ANALYSIS_FAILED, AnalysisGenerator, AnalysisOutcome, AnalysisStatus, NO_OUTPUT,
    NO_READABLE_TEXT, TranslationStatus,
};
pub use config::PipelineConfig;
pub use errors::{OcrError, PipelineError};
pub use extractor::TextExtractor;
pub use ocr::{OcrBackend, OcrFuture, OcrSpaceClient, OcrSpaceConfig};
pub use orchestrator::{
    IngestRequest, PipelineRun, PipelineStage, ReportPipeline, UpdateRequest, UploadedFile,
};
pub use record_manager::RecordManager;
pub use translator::{TRANSLATION_FAILED, TargetLanguage, Translation, Translator};
