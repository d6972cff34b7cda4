//! AI clinical summary of extracted report text.

use std::{fmt, sync::Arc, time::Duration};

use ai_llm_service::TextGenerator;
use report_store::AnalysisResult;
use tracing::{info, instrument, warn};

use crate::{
    config::PipelineConfig,
    prompt::AnalysisPromptTemplate,
    translator::{TargetLanguage, Translation, Translator},
};

pub const NO_READABLE_TEXT: &str = "⚠ No readable text found in report.";
pub const NO_OUTPUT: &str = "⚠ AI returned no output.";
pub const ANALYSIS_FAILED: &str = "⚠ AI analysis failed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStatus {
    Completed,
    /// Input under the minimum length; the backend was not called.
    NoReadableText,
    /// Backend failed, timed out or returned nothing.
    Failed,
}

impl AnalysisStatus {
    pub fn is_degraded(self) -> bool {
        self != AnalysisStatus::Completed
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::NoReadableText => "no_readable_text",
            AnalysisStatus::Failed => "failed",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationStatus {
    /// No non-default language requested, or the analysis itself degraded.
    Skipped,
    Translated,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    pub status: AnalysisStatus,
    pub translation: TranslationStatus,
}

pub struct AnalysisGenerator {
    generator: Arc<dyn TextGenerator>,
    translator: Arc<Translator>,
    template: AnalysisPromptTemplate,
    min_chars: usize,
    max_chars: usize,
    timeout: Duration,
}

impl AnalysisGenerator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        translator: Arc<Translator>,
        cfg: &PipelineConfig,
    ) -> Self {
        Self {
            generator,
            translator,
            template: AnalysisPromptTemplate::default().with_word_cap(cfg.word_cap),
            min_chars: cfg.min_text_chars,
            max_chars: cfg.max_input_chars,
            timeout: cfg.generation_timeout,
        }
    }

    /// Summarises `text`, translating the feedback when `language` is not the default.
    ///
    /// Never fails: unusable input or backend trouble produce placeholder feedback.
    #[instrument(skip(self, text), fields(template = self.template.version, chars = text.chars().count()))]
    pub async fn analyze(&self, text: &str, language: Option<TargetLanguage>) -> AnalysisOutcome {
        let text = text.trim();
        if text.chars().count() < self.min_chars {
            info!(status = %AnalysisStatus::NoReadableText, "skipping generation");
            return Self::degraded(NO_READABLE_TEXT, AnalysisStatus::NoReadableText);
        }

        let prompt = self.template.render(truncate_chars(text, self.max_chars));
        let started = std::time::Instant::now();
        let reply = tokio::time::timeout(self.timeout, self.generator.generate(&prompt)).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let feedback = match reply {
            Ok(Ok(out)) if !out.trim().is_empty() => out.trim().to_owned(),
            Ok(Ok(_)) => {
                warn!(latency_ms, "generation returned no output");
                return Self::degraded(NO_OUTPUT, AnalysisStatus::Failed);
            }
            Ok(Err(e)) if e.is_empty_response() => {
                warn!(latency_ms, error = %e, "generation returned no output");
                return Self::degraded(NO_OUTPUT, AnalysisStatus::Failed);
            }
            Ok(Err(e)) => {
                warn!(latency_ms, error = %e, "generation failed");
                return Self::degraded(ANALYSIS_FAILED, AnalysisStatus::Failed);
            }
            Err(_) => {
                warn!(latency_ms, timeout_ms = self.timeout.as_millis() as u64, "generation timed out");
                return Self::degraded(ANALYSIS_FAILED, AnalysisStatus::Failed);
            }
        };
        info!(latency_ms, status = %AnalysisStatus::Completed, "analysis generated");

        let mut result = AnalysisResult::new(feedback);
        let translation = match language.filter(|l| !l.is_default()) {
            None => TranslationStatus::Skipped,
            Some(target) => match self.translator.translate_to(&result.feedback, target).await {
                Translation::Translated(t) => {
                    result.translated = Some(t);
                    TranslationStatus::Translated
                }
                failed @ Translation::Failed => {
                    result.translated = Some(failed.into_text());
                    TranslationStatus::Failed
                }
            },
        };

        AnalysisOutcome {
            result,
            status: AnalysisStatus::Completed,
            translation,
        }
    }

    fn degraded(placeholder: &str, status: AnalysisStatus) -> AnalysisOutcome {
        AnalysisOutcome {
            result: AnalysisResult::new(placeholder),
            status,
            translation: TranslationStatus::Skipped,
        }
    }
}

/// First `max` chars of `s`, never splitting a character.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
