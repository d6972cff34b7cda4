//! Shared text-generation service.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Builds the provider HTTP client lazily on first use and caches it; a
//!   construction failure is returned to the caller and retried next call.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_llm_service::{LlmService, TextGenerator, config::default_config::config_from_env};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let svc = Arc::new(LlmService::new(config_from_env()?));
//! let text = svc.generate("Summarise: Hemoglobin 13.5 g/dL").await?;
//! println!("{text}");
//! # Ok(()) }
//! ```

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::AiLlmError,
    generator::{GenerateFuture, TextGenerator},
    services::{
        gemini_service::GeminiService, ollama_service::OllamaService,
        open_ai_service::OpenAiService,
    },
};

/// Provider client selected by [`LlmModelConfig::provider`].
enum ProviderClient {
    Gemini(GeminiService),
    OpenAI(OpenAiService),
    Ollama(OllamaService),
}

impl ProviderClient {
    fn build(cfg: &LlmModelConfig) -> Result<Self, AiLlmError> {
        Ok(match cfg.provider {
            LlmProvider::Gemini => ProviderClient::Gemini(GeminiService::new(cfg.clone())?),
            LlmProvider::OpenAI => ProviderClient::OpenAI(OpenAiService::new(cfg.clone())?),
            LlmProvider::Ollama => ProviderClient::Ollama(OllamaService::new(cfg.clone())?),
        })
    }

    async fn generate(&self, prompt: &str) -> Result<String, AiLlmError> {
        match self {
            ProviderClient::Gemini(c) => c.generate(prompt).await,
            ProviderClient::OpenAI(c) => c.generate(prompt).await,
            ProviderClient::Ollama(c) => c.generate(prompt).await,
        }
    }
}

/// Text-generation service bound to one model configuration.
pub struct LlmService {
    cfg: LlmModelConfig,
    client: RwLock<Option<Arc<ProviderClient>>>,
}

impl LlmService {
    pub fn new(cfg: LlmModelConfig) -> Self {
        Self {
            cfg,
            client: RwLock::new(None),
        }
    }

    /// Generates text for `prompt` using the configured provider.
    ///
    /// # Errors
    /// Returns [`AiLlmError`] if the client cannot be built or the call fails.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, AiLlmError> {
        let client = self.get_or_init().await?;
        client.generate(prompt).await
    }

    async fn get_or_init(&self) -> Result<Arc<ProviderClient>, AiLlmError> {
        if let Some(cli) = self.client.read().await.as_ref() {
            return Ok(cli.clone());
        }

        let mut w = self.client.write().await;
        if let Some(cli) = w.as_ref() {
            return Ok(cli.clone());
        }

        debug!(provider = %self.cfg.provider, model = %self.cfg.model, "building provider client");
        let cli = ProviderClient::build(&self.cfg).map_err(|e| {
            warn!(provider = %self.cfg.provider, error = %e, "provider client init failed");
            e
        })?;
        let cli = Arc::new(cli);
        *w = Some(cli.clone());
        Ok(cli)
    }
}

impl TextGenerator for LlmService {
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a> {
        Box::pin(self.generate_text(prompt))
    }
}
