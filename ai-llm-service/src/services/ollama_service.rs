//! Ollama client for self-hosted report analysis.
//!
//! - `POST {endpoint}/api/chat` with `stream=false`
//!
//! No API key; `cfg.api_key` is ignored.

use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::AiLlmError,
    services::transport::{client_for, empty_response, non_blank, post_json},
};

/// How long Ollama keeps the model resident after a call.
const KEEP_ALIVE: &str = "10m";

pub struct OllamaService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_chat: String,
}

impl OllamaService {
    /// # Errors
    /// `InvalidProvider`/`InvalidEndpoint` for a foreign or malformed config,
    /// [`AiLlmError::HttpTransport`] if the client cannot be built.
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        let (client, base) = client_for(LlmProvider::Ollama, &cfg)?;
        Ok(Self {
            client,
            url_chat: format!("{base}/api/chat"),
            cfg,
        })
    }

    /// One user turn; returns the assistant message.
    #[instrument(skip_all, fields(model = %self.cfg.model, prompt_len = prompt.len()))]
    pub async fn generate(&self, prompt: &str) -> Result<String, AiLlmError> {
        let body = ChatRequest::from_cfg(&self.cfg, prompt);
        let out: ChatResponse = post_json(
            &self.cfg,
            self.client.post(&self.url_chat),
            &self.url_chat,
            &body,
            "message.content",
        )
        .await?;

        if out.done_reason.as_deref() == Some("length") {
            warn!("ollama stopped at num_predict; analysis may be cut short");
        }
        non_blank(out.message.and_then(|m| m.content))
            .ok_or_else(|| empty_response(LlmProvider::Ollama))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
    keep_alive: &'a str,
    #[serde(skip_serializing_if = "Options::is_empty")]
    options: Options,
}

impl<'a> ChatRequest<'a> {
    fn from_cfg(cfg: &'a LlmModelConfig, prompt: &'a str) -> Self {
        Self {
            model: &cfg.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
            keep_alive: KEEP_ALIVE,
            options: Options {
                temperature: cfg.temperature,
                top_p: cfg.top_p,
                num_predict: cfg.max_tokens,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Default, Serialize)]
struct Options {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

impl Options {
    fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.top_p.is_none() && self.num_predict.is_none()
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ChatReply>,
    done_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: "llama3.1:8b".into(),
            endpoint: "http://localhost:11434/".into(),
            api_key: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: None,
        }
    }

    #[test]
    fn targets_chat_endpoint() {
        let svc = OllamaService::new(cfg()).unwrap();
        assert_eq!(svc.url_chat, "http://localhost:11434/api/chat");
    }

    #[test]
    fn omits_options_when_nothing_is_tuned() {
        let c = cfg();
        let json = serde_json::to_value(ChatRequest::from_cfg(&c, "read this")).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["content"], "read this");
        assert!(json.get("options").is_none());

        let mut tuned = cfg();
        tuned.max_tokens = Some(600);
        let json = serde_json::to_value(ChatRequest::from_cfg(&tuned, "x")).unwrap();
        assert_eq!(json["options"]["num_predict"], 600);
    }

    #[test]
    fn decodes_assistant_message() {
        let raw = r#"{"model":"llama3.1:8b","message":{"role":"assistant","content":"1. Summary"},"done":true,"done_reason":"stop"}"#;
        let out: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(out.message.and_then(|m| m.content).as_deref(), Some("1. Summary"));
        assert_eq!(out.done_reason.as_deref(), Some("stop"));
    }
}
