//! Sequences intake → extraction → analysis → translation → persistence.
//!
//! Only intake (file count, file type, blob upload, field validation) and
//! persistence can fail a run. Extraction and AI stages degrade and the run
//! still reaches [`PipelineStage::Done`].

use std::sync::Arc;

use ai_llm_service::TextGenerator;
use blob_store::{BlobStore, ContentHint};
use report_store::{FileKind, Report, ReportFields, ReportFile, ReportStore};
use tracing::{info, instrument};

use crate::{
    analysis::{AnalysisGenerator, AnalysisStatus, TranslationStatus},
    config::PipelineConfig,
    errors::PipelineError,
    extractor::TextExtractor,
    ocr::OcrBackend,
    record_manager::RecordManager,
    translator::{TargetLanguage, Translator},
};

/// One file part received from a client.
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    fn hint(&self) -> ContentHint {
        ContentHint::new(self.file_name.clone(), self.content_type.clone())
    }

    /// Kind from the declared content type, else from the file extension.
    pub fn kind(&self) -> Result<FileKind, PipelineError> {
        let hint = self.hint();
        hint.effective_content_type()
            .as_deref()
            .and_then(FileKind::from_content_type)
            .ok_or_else(|| {
                PipelineError::UnsupportedFile(
                    hint.effective_content_type()
                        .or_else(|| self.file_name.clone())
                        .unwrap_or_else(|| "unknown".into()),
                )
            })
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
    pub fields: ReportFields,
    pub files: Vec<UploadedFile>,
    /// Request language code (`romanUrdu`, ...).
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub fields: ReportFields,
    pub files: Vec<UploadedFile>,
    pub rerun_analysis: bool,
    pub language: Option<String>,
}

/// States a run passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    FilesRecorded { count: usize },
    TextExtracted { empty: bool },
    Analyzed { status: AnalysisStatus },
    Translated { status: TranslationStatus },
    Persisted,
    Done,
}

#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub report: Report,
    pub stages: Vec<PipelineStage>,
}

pub struct ReportPipeline {
    blobs: Arc<dyn BlobStore>,
    extractor: TextExtractor,
    analyzer: AnalysisGenerator,
    translator: Arc<Translator>,
    records: RecordManager,
    cfg: PipelineConfig,
}

impl ReportPipeline {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        ocr: Arc<dyn OcrBackend>,
        blobs: Arc<dyn BlobStore>,
        store: Arc<dyn ReportStore>,
        cfg: PipelineConfig,
    ) -> Self {
        let translator = Arc::new(Translator::new(generator.clone(), cfg.generation_timeout));
        Self {
            extractor: TextExtractor::new(blobs.clone(), ocr, &cfg),
            analyzer: AnalysisGenerator::new(generator, translator.clone(), &cfg),
            translator,
            records: RecordManager::new(store),
            blobs,
            cfg,
        }
    }

    /// Creates a report from metadata and uploads, then analyses its first file.
    #[instrument(skip_all, fields(files = req.files.len()))]
    pub async fn ingest(&self, req: IngestRequest) -> Result<PipelineRun, PipelineError> {
        let mut stages = vec![PipelineStage::Received];

        let metadata = req.fields.into_metadata()?;
        let files = self.upload_all(&req.files).await?;
        let report = self.records.create(metadata, files).await?;
        stages.push(PipelineStage::FilesRecorded {
            count: report.files.len(),
        });

        let _guard = self.records.lock(&report.id).await;
        let result = self
            .analyze_first(&report, req.language.as_deref(), &mut stages)
            .await;
        let report = self.records.set_analysis(&report.id, result).await?;
        Self::finish(&report, &mut stages);
        Ok(PipelineRun { report, stages })
    }

    /// Merges fields and new uploads into `id`; re-analyses when asked.
    #[instrument(skip(self, req), fields(files = req.files.len(), rerun = req.rerun_analysis))]
    pub async fn update(&self, id: &str, req: UpdateRequest) -> Result<PipelineRun, PipelineError> {
        let mut stages = vec![PipelineStage::Received];
        self.check_files(&req.files)?;

        let _guard = self.records.lock(id).await;
        let mut report = self.records.load(id).await?;

        let metadata = RecordManager::merged_metadata(&report, req.fields)?;
        let new_files = self.upload_all(&req.files).await?;
        RecordManager::merge(&mut report, metadata, new_files);
        let mut report = self.records.save(&report).await?;
        stages.push(PipelineStage::FilesRecorded {
            count: report.files.len(),
        });

        if req.rerun_analysis && !report.files.is_empty() {
            let result = self
                .analyze_first(&report, req.language.as_deref(), &mut stages)
                .await;
            report = self.records.set_analysis(id, result).await?;
        }
        Self::finish(&report, &mut stages);
        Ok(PipelineRun { report, stages })
    }

    /// Standalone translation; see [`Translator::translate`].
    pub async fn translate(&self, text: &str, lang: Option<&str>) -> String {
        self.translator.translate(text, lang).await
    }

    pub async fn get(&self, id: &str) -> Result<Report, PipelineError> {
        self.records.load(id).await
    }

    pub async fn list_by_member(&self, family_member: &str) -> Result<Vec<Report>, PipelineError> {
        self.records.list_by_member(family_member).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), PipelineError> {
        self.records.delete(id).await
    }

    fn check_files(&self, files: &[UploadedFile]) -> Result<Vec<FileKind>, PipelineError> {
        let max = self.cfg.max_files_per_upload;
        if files.len() > max {
            return Err(PipelineError::TooManyFiles {
                max,
                got: files.len(),
            });
        }
        files.iter().map(UploadedFile::kind).collect()
    }

    /// Stores every upload in order. All types are checked before the first write.
    async fn upload_all(&self, files: &[UploadedFile]) -> Result<Vec<ReportFile>, PipelineError> {
        let kinds = self.check_files(files)?;
        let mut out = Vec::with_capacity(files.len());
        for (file, kind) in files.iter().zip(kinds) {
            let url = self.blobs.store(file.bytes.clone(), &file.hint()).await?;
            out.push(ReportFile { url, kind });
        }
        Ok(out)
    }

    async fn analyze_first(
        &self,
        report: &Report,
        language: Option<&str>,
        stages: &mut Vec<PipelineStage>,
    ) -> report_store::AnalysisResult {
        let text = match report.first_file() {
            Some(first) => self.extractor.extract(first).await,
            None => String::new(),
        };
        stages.push(PipelineStage::TextExtracted {
            empty: text.is_empty(),
        });

        let outcome = self
            .analyzer
            .analyze(&text, language.and_then(TargetLanguage::parse))
            .await;
        stages.push(PipelineStage::Analyzed {
            status: outcome.status,
        });
        stages.push(PipelineStage::Translated {
            status: outcome.translation,
        });
        outcome.result
    }

    fn finish(report: &Report, stages: &mut Vec<PipelineStage>) {
        stages.push(PipelineStage::Persisted);
        stages.push(PipelineStage::Done);
        info!(report_id = %report.id, files = report.files.len(), ?stages, "pipeline run finished");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use blob_store::MemoryBlobStore;
    use chrono::NaiveDate;
    use report_store::MemoryReportStore;

    use super::*;
    use crate::{
        analysis::{ANALYSIS_FAILED, NO_READABLE_TEXT},
        test_support::{Reply, StubGenerator, StubOcr, pdf_with_text},
    };

    const FOUR_SECTIONS: &str = "1. Summary: hemoglobin within range.\n\
        2. Implications: none.\n3. Recommendations: routine follow-up.\n4. Normal.";

    struct Harness {
        pipeline: ReportPipeline,
        generator: Arc<StubGenerator>,
        ocr: Arc<StubOcr>,
        blobs: Arc<MemoryBlobStore>,
    }

    fn harness(reply: Reply) -> Harness {
        let generator = Arc::new(StubGenerator::new(reply));
        let ocr = Arc::new(StubOcr::new(
            "Fasting sugar 92 mg/dL, within the normal reference interval",
        ));
        let blobs = Arc::new(MemoryBlobStore::new());
        let pipeline = ReportPipeline::new(
            generator.clone(),
            ocr.clone(),
            blobs.clone(),
            Arc::new(MemoryReportStore::new()),
            PipelineConfig::default(),
        );
        Harness {
            pipeline,
            generator,
            ocr,
            blobs,
        }
    }

    fn fields() -> ReportFields {
        ReportFields {
            family_member: Some("member-1".into()),
            title: Some("CBC".into()),
            test_name: Some("Complete Blood Count".into()),
            hospital_or_lab: Some("City Lab".into()),
            date: NaiveDate::from_ymd_opt(2024, 5, 1),
            ..ReportFields::default()
        }
    }

    fn pdf_upload() -> UploadedFile {
        UploadedFile {
            file_name: Some("cbc.pdf".into()),
            content_type: Some("application/pdf".into()),
            bytes: pdf_with_text("Hemoglobin: 13.5 g/dL, normal range"),
        }
    }

    fn png_upload() -> UploadedFile {
        UploadedFile {
            file_name: Some("sugar.png".into()),
            content_type: None,
            bytes: b"\x89PNG\r\n\x1a\nimage".to_vec(),
        }
    }

    #[tokio::test]
    async fn ingest_pdf_produces_analysis_and_full_trace() {
        let h = harness(Reply::Text(FOUR_SECTIONS.into()));
        let run = h
            .pipeline
            .ingest(IngestRequest {
                fields: fields(),
                files: vec![pdf_upload()],
                language: None,
            })
            .await
            .unwrap();

        assert_eq!(run.report.files.len(), 1);
        assert_eq!(run.report.files[0].kind, FileKind::Pdf);
        let analysis = run.report.ai_analysis.as_ref().unwrap();
        assert_eq!(analysis.feedback, FOUR_SECTIONS);
        assert!(h.generator.last_prompt().unwrap().contains("Hemoglobin"));

        assert_eq!(
            run.stages,
            vec![
                PipelineStage::Received,
                PipelineStage::FilesRecorded { count: 1 },
                PipelineStage::TextExtracted { empty: false },
                PipelineStage::Analyzed {
                    status: AnalysisStatus::Completed
                },
                PipelineStage::Translated {
                    status: TranslationStatus::Skipped
                },
                PipelineStage::Persisted,
                PipelineStage::Done,
            ]
        );
        assert_eq!(h.pipeline.get(&run.report.id).await.unwrap(), run.report);
    }

    #[tokio::test]
    async fn ingest_without_files_records_unreadable_placeholder() {
        let h = harness(Reply::Text("unused".into()));
        let run = h
            .pipeline
            .ingest(IngestRequest {
                fields: fields(),
                ..IngestRequest::default()
            })
            .await
            .unwrap();

        assert!(run.report.files.is_empty());
        assert_eq!(run.report.ai_analysis.unwrap().feedback, NO_READABLE_TEXT);
        assert_eq!(h.generator.call_count(), 0);
        assert!(run.stages.contains(&PipelineStage::TextExtracted { empty: true }));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_backend_still_persists_report() {
        let h = harness(Reply::Hang);
        let run = h
            .pipeline
            .ingest(IngestRequest {
                fields: fields(),
                files: vec![pdf_upload()],
                language: Some("romanUrdu".into()),
            })
            .await
            .unwrap();

        assert_eq!(run.report.ai_analysis.as_ref().unwrap().feedback, ANALYSIS_FAILED);
        assert!(run.stages.contains(&PipelineStage::Analyzed {
            status: AnalysisStatus::Failed
        }));
        assert_eq!(run.stages.last(), Some(&PipelineStage::Done));
        let stored = h.pipeline.get(&run.report.id).await.unwrap();
        assert_eq!(stored.ai_analysis, run.report.ai_analysis);
    }

    #[tokio::test]
    async fn rerun_appends_image_and_reanalyses_first_file() {
        let h = harness(Reply::Text(FOUR_SECTIONS.into()));
        let created = h
            .pipeline
            .ingest(IngestRequest {
                fields: fields(),
                files: vec![pdf_upload()],
                language: None,
            })
            .await
            .unwrap()
            .report;
        assert_eq!(h.generator.call_count(), 1);

        let run = h
            .pipeline
            .update(
                &created.id,
                UpdateRequest {
                    files: vec![png_upload()],
                    rerun_analysis: true,
                    ..UpdateRequest::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(run.report.files.len(), 2);
        assert_eq!(run.report.files[0], created.files[0]);
        assert_eq!(run.report.files[1].kind, FileKind::Image);
        assert_eq!(h.generator.call_count(), 2);
        assert!(h.generator.last_prompt().unwrap().contains("Hemoglobin"));
        assert_eq!(h.ocr.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(h.blobs.len().await, 2);
    }

    #[tokio::test]
    async fn update_without_rerun_keeps_analysis() {
        let h = harness(Reply::Text(FOUR_SECTIONS.into()));
        let created = h
            .pipeline
            .ingest(IngestRequest {
                fields: fields(),
                files: vec![png_upload()],
                language: None,
            })
            .await
            .unwrap()
            .report;

        let run = h
            .pipeline
            .update(
                &created.id,
                UpdateRequest {
                    fields: ReportFields {
                        price: Some(2500.0),
                        ..ReportFields::default()
                    },
                    ..UpdateRequest::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(run.report.metadata.price, 2500.0);
        assert_eq!(run.report.ai_analysis, created.ai_analysis);
        assert!(!run
            .stages
            .iter()
            .any(|s| matches!(s, PipelineStage::Analyzed { .. })));
        assert_eq!(h.generator.call_count(), 1);
    }

    #[tokio::test]
    async fn intake_errors_are_terminal_and_store_nothing() {
        let h = harness(Reply::Text("x".into()));

        let too_many = IngestRequest {
            fields: fields(),
            files: vec![pdf_upload(); 6],
            language: None,
        };
        assert!(matches!(
            h.pipeline.ingest(too_many).await,
            Err(PipelineError::TooManyFiles { max: 5, got: 6 })
        ));

        let bad_type = IngestRequest {
            fields: fields(),
            files: vec![
                pdf_upload(),
                UploadedFile {
                    file_name: Some("notes.txt".into()),
                    content_type: Some("text/plain".into()),
                    bytes: b"hi".to_vec(),
                },
            ],
            language: None,
        };
        assert!(matches!(
            h.pipeline.ingest(bad_type).await,
            Err(PipelineError::UnsupportedFile(_))
        ));

        let mut missing = fields();
        missing.title = None;
        assert!(matches!(
            h.pipeline
                .ingest(IngestRequest {
                    fields: missing,
                    files: vec![pdf_upload()],
                    language: None,
                })
                .await,
            Err(PipelineError::Validation(_))
        ));
        assert_eq!(h.blobs.len().await, 0);
    }

    #[tokio::test]
    async fn rejected_update_uploads_nothing() {
        let h = harness(Reply::Text("x".into()));
        let id = h
            .pipeline
            .ingest(IngestRequest {
                fields: fields(),
                ..IngestRequest::default()
            })
            .await
            .unwrap()
            .report
            .id;

        let err = h
            .pipeline
            .update(
                &id,
                UpdateRequest {
                    fields: ReportFields {
                        hospital_or_lab: Some(String::new()),
                        ..ReportFields::default()
                    },
                    files: vec![png_upload()],
                    ..UpdateRequest::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Validation(_)));
        assert_eq!(h.blobs.len().await, 0);
        let stored = h.pipeline.get(&id).await.unwrap();
        assert!(stored.files.is_empty());
        assert_eq!(stored.metadata.hospital_or_lab, "City Lab");
    }

    #[tokio::test]
    async fn update_unknown_report_is_not_found() {
        let h = harness(Reply::Text("x".into()));
        let err = h
            .pipeline
            .update("nope", UpdateRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn translate_unreachable_backend_returns_indicator() {
        let h = harness(Reply::Fail);
        assert_eq!(
            h.pipeline.translate("Result is normal", Some("romanUrdu")).await,
            crate::translator::TRANSLATION_FAILED
        );
    }

    #[tokio::test]
    async fn concurrent_updates_keep_every_file() {
        let h = Arc::new(harness(Reply::Text(FOUR_SECTIONS.into())));
        let id = h
            .pipeline
            .ingest(IngestRequest {
                fields: fields(),
                files: vec![pdf_upload()],
                language: None,
            })
            .await
            .unwrap()
            .report
            .id;

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let h = h.clone();
            let id = id.clone();
            tasks.push(tokio::spawn(async move {
                h.pipeline
                    .update(
                        &id,
                        UpdateRequest {
                            files: vec![png_upload()],
                            rerun_analysis: true,
                            ..UpdateRequest::default()
                        },
                    )
                    .await
                    .map(|_| ())
            }));
        }
        for t in tasks {
            tokio::time::timeout(Duration::from_secs(30), t)
                .await
                .unwrap()
                .unwrap()
                .unwrap();
        }
        assert_eq!(h.pipeline.get(&id).await.unwrap().files.len(), 5);
    }
}
