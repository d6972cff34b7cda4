//! OpenAI chat completions client.
//!
//! - `POST {endpoint}/v1/chat/completions`
//!
//! A missing API key is reported per call, so a misconfigured deployment
//! still serves requests with degraded analysis.

use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{AiLlmError, ProviderError, ProviderErrorKind},
    services::transport::{client_for, empty_response, non_blank, post_json},
};

#[derive(Debug)]
pub struct OpenAiService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_chat: String,
}

impl OpenAiService {
    /// # Errors
    /// `InvalidProvider`/`InvalidEndpoint` for a foreign or malformed config,
    /// [`AiLlmError::HttpTransport`] if the client cannot be built.
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        let (client, base) = client_for(LlmProvider::OpenAI, &cfg)?;
        Ok(Self {
            client,
            url_chat: format!("{base}/v1/chat/completions"),
            cfg,
        })
    }

    /// Sends the prompt as a single user message and returns the first
    /// non-empty choice.
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
            ProviderError::new(LlmProvider::OpenAI, ProviderErrorKind::MissingApiKey)
        })?;

        let body = ChatCompletionRequest::from_cfg(&self.cfg, prompt);
        let out: ChatCompletionResponse = post_json(
            &self.cfg,
            self.client.post(&self.url_chat).bearer_auth(api_key),
            &self.url_chat,
            &body,
            "choices[0].message.content",
        )
        .await?;

        out.into_text().ok_or_else(|| empty_response(LlmProvider::OpenAI))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

impl<'a> ChatCompletionRequest<'a> {
    fn from_cfg(cfg: &'a LlmModelConfig, prompt: &'a str) -> Self {
        Self {
            model: &cfg.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            max_tokens: cfg.max_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

impl ChatCompletionResponse {
    fn into_text(self) -> Option<String> {
        self.choices.into_iter().find_map(|c| {
            if c.finish_reason.as_deref() == Some("length") {
                warn!("completion hit max_tokens; analysis may be cut short");
            }
            non_blank(c.message.and_then(|m| m.content))
        })
    }
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(api_key: Option<&str>) -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::OpenAI,
            model: "gpt-4o-mini".into(),
            endpoint: "https://api.openai.com".into(),
            api_key: api_key.map(str::to_string),
            max_tokens: None,
            temperature: Some(0.2),
            top_p: None,
            timeout_secs: None,
        }
    }

    #[test]
    fn chat_request_carries_single_user_message() {
        let c = cfg(Some("sk-test"));
        let json = serde_json::to_value(ChatCompletionRequest::from_cfg(&c, "hi")).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
        assert_eq!(json["messages"][0]["content"], "hi");
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn skips_empty_choices() {
        let raw = r#"{"choices":[
            {"message":{"role":"assistant","content":""},"finish_reason":"stop"},
            {"message":{"role":"assistant","content":"4. Normal"},"finish_reason":"length"}
        ]}"#;
        let out: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(out.into_text().as_deref(), Some("4. Normal"));

        let none: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(none.into_text().is_none());
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let svc = OpenAiService::new(cfg(None)).unwrap();
        let err = svc.generate("prompt").await.unwrap_err();
        assert!(err.to_string().contains("API key is not configured"));
    }
}
