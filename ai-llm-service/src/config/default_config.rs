//! Default generation configs loaded from environment variables.
//!
//! One constructor per provider plus [`config_from_env`], which picks the
//! provider from `LLM_KIND` (default `gemini`).
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND`          = provider kind (`gemini`, `openai`, `ollama`)
//! - `LLM_MAX_TOKENS`    = optional max tokens (u32)
//! - `LLM_TIMEOUT_SECS`  = optional request timeout (u64, default 30)
//!
//! Gemini:
//! - `GEMINI_API_KEY` (not validated here; a missing key surfaces per call)
//! - `GEMINI_MODEL`   (default `gemini-2.0-flash`)
//! - `GEMINI_URL`     (default `https://generativelanguage.googleapis.com`)
//!
//! OpenAI:
//! - `OPENAI_API_KEY`, `OPENAI_MODEL` (default `gpt-4o-mini`), `OPENAI_URL`
//!
//! Ollama:
//! - `OLLAMA_URL` or `OLLAMA_PORT` (mandatory), `OLLAMA_MODEL` (mandatory)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt_u32, env_opt_u64, must_env, opt_env,
        validate_http_endpoint,
    },
};

const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Builds the generation config for the provider named by `LLM_KIND`.
///
/// # Errors
/// - [`ConfigError::UnsupportedProvider`] for an unknown `LLM_KIND`
/// - any error of the provider-specific constructor
pub fn config_from_env() -> Result<LlmModelConfig, AiLlmError> {
    let kind = opt_env("LLM_KIND")
        .map(|k| k.parse::<LlmProvider>())
        .transpose()?
        .unwrap_or(LlmProvider::Gemini);

    match kind {
        LlmProvider::Gemini => config_gemini(),
        LlmProvider::OpenAI => config_openai(),
        LlmProvider::Ollama => config_ollama(),
    }
}

/// Gemini `generateContent` config.
///
/// # Defaults
/// - `temperature = Some(0.2)`
/// - `timeout_secs = Some(30)`
pub fn config_gemini() -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = opt_env("GEMINI_URL").unwrap_or_else(|| DEFAULT_GEMINI_URL.into());
    validate_http_endpoint("GEMINI_URL", &endpoint)?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Gemini,
        model: opt_env("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into()),
        endpoint,
        api_key: opt_env("GEMINI_API_KEY"),
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(0.2),
        top_p: None,
        timeout_secs: Some(timeout_secs()?),
    })
}

/// OpenAI chat completions config.
pub fn config_openai() -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = opt_env("OPENAI_URL").unwrap_or_else(|| DEFAULT_OPENAI_URL.into());
    validate_http_endpoint("OPENAI_URL", &endpoint)?;

    Ok(LlmModelConfig {
        provider: LlmProvider::OpenAI,
        model: opt_env("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.into()),
        endpoint,
        api_key: opt_env("OPENAI_API_KEY"),
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(0.2),
        top_p: None,
        timeout_secs: Some(timeout_secs()?),
    })
}

/// Ollama `/api/chat` config.
///
/// # Errors
/// - [`ConfigError::MissingVar`] if neither `OLLAMA_URL` nor `OLLAMA_PORT` is set,
///   or `OLLAMA_MODEL` is missing
/// - [`ConfigError::InvalidNumber`] if `OLLAMA_PORT` is invalid
pub fn config_ollama() -> Result<LlmModelConfig, AiLlmError> {
    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model: must_env("OLLAMA_MODEL")?,
        endpoint: ollama_endpoint()?,
        api_key: None,
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(0.2),
        top_p: None,
        timeout_secs: Some(timeout_secs()?),
    })
}

/// Resolves the Ollama endpoint strictly from environment.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Some(url) = opt_env("OLLAMA_URL") {
        validate_http_endpoint("OLLAMA_URL", &url)?;
        return Ok(url);
    }
    if let Some(port) = opt_env("OLLAMA_PORT") {
        port.trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidNumber {
                var: "OLLAMA_PORT",
                reason: "expected u16 (1..=65535)",
            })?;
        return Ok(format!("http://localhost:{}", port.trim()));
    }
    Err(AiLlmError::Config(ConfigError::MissingVar(
        "OLLAMA_URL or OLLAMA_PORT",
    )))
}

fn timeout_secs() -> Result<u64, AiLlmError> {
    Ok(env_opt_u64("LLM_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS))
}
