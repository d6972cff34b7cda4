//! Pipeline knobs loaded from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `FETCH_TIMEOUT_SECS` | 30 |
//! | `OCR_TIMEOUT_SECS` | 30 |
//! | `GENERATION_TIMEOUT_SECS` | 30 |
//! | `ANALYSIS_MAX_INPUT_CHARS` | 3000 |
//! | `ANALYSIS_MIN_TEXT_CHARS` | 30 |
//! | `ANALYSIS_WORD_CAP` | 200 |
//! | `MAX_FILES_PER_UPLOAD` | 5 |
//! | `OCR_LANGUAGE` | `eng` |

use std::{str::FromStr, time::Duration};

use crate::errors::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Bound on reading one blob during extraction.
    pub fetch_timeout: Duration,
    pub ocr_timeout: Duration,
    /// Bound on one generation or translation call.
    pub generation_timeout: Duration,
    /// Longest text (in chars) sent to the generator.
    pub max_input_chars: usize,
    /// Shorter trimmed text is treated as unreadable.
    pub min_text_chars: usize,
    pub word_cap: usize,
    pub max_files_per_upload: usize,
    pub ocr_language: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            ocr_timeout: Duration::from_secs(30),
            generation_timeout: Duration::from_secs(30),
            max_input_chars: 3000,
            min_text_chars: 30,
            word_cap: 200,
            max_files_per_upload: 5,
            ocr_language: "eng".into(),
        }
    }
}

impl PipelineConfig {
    /// Reads overrides from the environment on top of [`Default`].
    ///
    /// # Errors
    /// [`PipelineError::Config`] when a variable is set but does not parse.
    pub fn from_env() -> Result<Self, PipelineError> {
        let d = Self::default();
        Ok(Self {
            fetch_timeout: secs("FETCH_TIMEOUT_SECS", d.fetch_timeout)?,
            ocr_timeout: secs("OCR_TIMEOUT_SECS", d.ocr_timeout)?,
            generation_timeout: secs("GENERATION_TIMEOUT_SECS", d.generation_timeout)?,
            max_input_chars: parse("ANALYSIS_MAX_INPUT_CHARS", d.max_input_chars)?,
            min_text_chars: parse("ANALYSIS_MIN_TEXT_CHARS", d.min_text_chars)?,
            word_cap: parse("ANALYSIS_WORD_CAP", d.word_cap)?,
            max_files_per_upload: parse("MAX_FILES_PER_UPLOAD", d.max_files_per_upload)?,
            ocr_language: env("OCR_LANGUAGE", &d.ocr_language),
        })
    }
}

pub(crate) fn env(k: &str, dflt: &str) -> String {
    std::env::var(k)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| dflt.to_string())
}

fn parse<T: FromStr>(k: &str, dflt: T) -> Result<T, PipelineError> {
    match std::env::var(k) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map_err(|_| PipelineError::Config(format!("{k}: expected a number, got {v:?}"))),
        _ => Ok(dflt),
    }
}

fn secs(k: &str, dflt: Duration) -> Result<Duration, PipelineError> {
    parse(k, dflt.as_secs()).map(Duration::from_secs)
}
