//! Google Gemini client for text generation.
//!
//! Single, non-streaming call:
//! - POST {endpoint}/v1beta/models/{model}:generateContent
//!
//! The API key travels in the `x-goog-api-key` header so it never shows up in
//! logged URLs. A missing key is not a construction error: the client is
//! still built and every `generate` call fails with `MissingApiKey`, which
//! callers treat like any other generation failure.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{AiLlmError, ProviderError, ProviderErrorKind},
    services::transport::{client_for, empty_response, non_blank, post_json},
};

/// Thin client for the Gemini `generateContent` API.
#[derive(Debug)]
pub struct GeminiService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_generate: String,
}

impl GeminiService {
    /// Creates a new [`GeminiService`] from the given config.
    ///
    /// # Errors
    /// - `InvalidProvider` if `cfg.provider` is not Gemini
    /// - `InvalidEndpoint` if `cfg.endpoint` is not http/https
    /// - [`AiLlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        let (client, base) = client_for(LlmProvider::Gemini, &cfg)?;
        let url_generate = format!("{base}/v1beta/models/{}:generateContent", cfg.model);
        Ok(Self {
            client,
            cfg,
            url_generate,
        })
    }

    /// Performs a single `generateContent` request and returns the first
    /// candidate's first text part.
    ///
    /// # Errors
    /// - `MissingApiKey` if no key is configured
    /// - `HttpStatus` for non-2xx responses
    /// - [`AiLlmError::Timeout`] when the request exceeds `cfg.timeout()`
    /// - [`AiLlmError::HttpTransport`] for other client/network failures
    /// - `Decode` / `EmptyResponse` for malformed or empty payloads
    #[instrument(skip_all, fields(model = %self.cfg.model, prompt_len = prompt.len()))]
    pub async fn generate(&self, prompt: &str) -> Result<String, AiLlmError> {
        let api_key = self.cfg.api_key.as_deref().ok_or_else(|| {
            ProviderError::new(LlmProvider::Gemini, ProviderErrorKind::MissingApiKey)
        })?;

        let body = GenerateContentRequest::from_cfg(&self.cfg, prompt);
        let out: GenerateContentResponse = post_json(
            &self.cfg,
            self.client
                .post(&self.url_generate)
                .header("x-goog-api-key", api_key),
            &self.url_generate,
            &body,
            "candidates[0].content.parts[0].text",
        )
        .await?;

        out.first_text()
            .ok_or_else(|| empty_response(LlmProvider::Gemini))
    }
}

/* ===========================================================================
HTTP payloads
======================================================================== */

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl<'a> GenerateContentRequest<'a> {
    fn from_cfg(cfg: &LlmModelConfig, prompt: &'a str) -> Self {
        let generation_config = if cfg.temperature.is_some()
            || cfg.top_p.is_some()
            || cfg.max_tokens.is_some()
        {
            Some(GenerationConfig {
                temperature: cfg.temperature,
                top_p: cfg.top_p,
                max_output_tokens: cfg.max_tokens,
            })
        } else {
            None
        };

        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config,
        }
    }
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .find_map(|p| non_blank(p.text))
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}
