use std::{fmt, str::FromStr};

use crate::error_handler::ConfigError;

/// Represents the provider (backend) used for text generation.
///
/// Adding more providers in the future can be done by extending this enum
/// and adding a client under [`crate::services`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// Google Gemini `generateContent` API.
    Gemini,
    /// OpenAI chat completions API.
    OpenAI,
    /// Local Ollama runtime.
    Ollama,
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LlmProvider::Gemini => "gemini",
            LlmProvider::OpenAI => "openai",
            LlmProvider::Ollama => "ollama",
        };
        f.write_str(s)
    }
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    /// Parses the value of `LLM_KIND` (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(LlmProvider::Gemini),
            "openai" | "chatgpt" => Ok(LlmProvider::OpenAI),
            "ollama" => Ok(LlmProvider::Ollama),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}
