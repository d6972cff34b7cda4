//! Versioned prompt templates.
//!
//! Prompts are plain data so a change in wording bumps `version` and shows up
//! in logs next to every generated analysis.

/// Clinical summary prompt: a preamble, numbered sections and a word cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisPromptTemplate {
    pub version: &'static str,
    pub preamble: &'static str,
    pub sections: &'static [&'static str],
    pub word_cap: usize,
}

impl AnalysisPromptTemplate {
    pub const V1: AnalysisPromptTemplate = AnalysisPromptTemplate {
        version: "analysis-v1",
        preamble: "You are a medical assistant. Analyze this lab report and provide:",
        sections: &[
            "Summary of findings",
            "Possible health implications",
            "Recommendations",
            "Whether the results are normal or abnormal",
        ],
        word_cap: 200,
    };

    pub fn with_word_cap(mut self, word_cap: usize) -> Self {
        self.word_cap = word_cap;
        self
    }

    /// Full prompt; `report_text` is placed last, verbatim.
    pub fn render(&self, report_text: &str) -> String {
        let mut out = String::with_capacity(report_text.len() + 320);
        out.push_str(self.preamble);
        out.push('\n');
        for (i, s) in self.sections.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, s));
        }
        out.push_str(&format!("\nKeep it under {} words.\n\n", self.word_cap));
        out.push_str("Report text:\n");
        out.push_str(report_text);
        out
    }
}

impl Default for AnalysisPromptTemplate {
    fn default() -> Self {
        Self::V1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationPromptTemplate {
    pub version: &'static str,
}

impl TranslationPromptTemplate {
    pub const V1: TranslationPromptTemplate = TranslationPromptTemplate {
        version: "translation-v1",
    };

    /// `roman_script` asks for Latin-alphabet output (Roman Urdu / Roman Hindi).
    pub fn render(&self, text: &str, language: &str, roman_script: bool) -> String {
        let script = if roman_script {
            " Write it in Roman script using the Latin alphabet, not the native script."
        } else {
            ""
        };
        format!(
            "Translate the following medical analysis into {language}.{script} \
             Keep the meaning and any numbers unchanged. Return only the translation.\n\n\
             Text:\n{text}"
        )
    }
}

impl Default for TranslationPromptTemplate {
    fn default() -> Self {
        Self::V1
    }
}
