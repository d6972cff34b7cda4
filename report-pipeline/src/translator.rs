//! Optional translation of analysis text into a closed set of languages.

use std::{fmt, sync::Arc, time::Duration};

use ai_llm_service::TextGenerator;
use tracing::{debug, instrument, warn};

use crate::prompt::TranslationPromptTemplate;

pub const TRANSLATION_FAILED: &str = "⚠ Translation failed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetLanguage {
    English,
    RomanUrdu,
    RomanHindi,
}

impl TargetLanguage {
    /// Accepts the request codes `english`, `romanUrdu` and `romanHindi`
    /// (case-insensitive). Anything else is unknown.
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "english" | "en" => Some(TargetLanguage::English),
            "romanurdu" | "roman_urdu" | "roman-urdu" => Some(TargetLanguage::RomanUrdu),
            "romanhindi" | "roman_hindi" | "roman-hindi" => Some(TargetLanguage::RomanHindi),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            TargetLanguage::English => "English",
            TargetLanguage::RomanUrdu => "Roman Urdu",
            TargetLanguage::RomanHindi => "Roman Hindi",
        }
    }

    /// Analyses are produced in English, so no translation pass is needed.
    pub fn is_default(self) -> bool {
        self == TargetLanguage::English
    }

    fn roman_script(self) -> bool {
        !self.is_default()
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Result of one translation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    Translated(String),
    /// Backend failed, timed out or returned nothing.
    Failed,
}

impl Translation {
    pub fn into_text(self) -> String {
        match self {
            Translation::Translated(t) => t,
            Translation::Failed => TRANSLATION_FAILED.to_owned(),
        }
    }
}

pub struct Translator {
    generator: Arc<dyn TextGenerator>,
    template: TranslationPromptTemplate,
    timeout: Duration,
}

impl Translator {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self {
            generator,
            template: TranslationPromptTemplate::default(),
            timeout,
        }
    }

    /// Translates `text` for a request-supplied language code.
    ///
    /// Empty text, or a missing or unknown code, returns `text` unchanged.
    /// Backend failure returns [`TRANSLATION_FAILED`]. Never errors.
    pub async fn translate(&self, text: &str, lang: Option<&str>) -> String {
        if text.trim().is_empty() {
            return text.to_owned();
        }
        match lang.and_then(TargetLanguage::parse) {
            Some(target) => self.translate_to(text, target).await.into_text(),
            None => text.to_owned(),
        }
    }

    #[instrument(skip(self, text), fields(template = self.template.version, chars = text.len()))]
    pub async fn translate_to(&self, text: &str, target: TargetLanguage) -> Translation {
        let prompt = self
            .template
            .render(text, target.display_name(), target.roman_script());

        match tokio::time::timeout(self.timeout, self.generator.generate(&prompt)).await {
            Ok(Ok(out)) if !out.trim().is_empty() => {
                debug!(%target, "translation completed");
                Translation::Translated(out.trim().to_owned())
            }
            Ok(Ok(_)) => {
                warn!(%target, "translation backend returned no output");
                Translation::Failed
            }
            Ok(Err(e)) => {
                warn!(%target, error = %e, "translation failed");
                Translation::Failed
            }
            Err(_) => {
                warn!(%target, timeout_ms = self.timeout.as_millis() as u64, "translation timed out");
                Translation::Failed
            }
        }
    }
}
