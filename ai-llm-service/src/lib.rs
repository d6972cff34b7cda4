//! Shared text-generation service for the lab-report backend.
//!
//! The crate exposes one seam, [`TextGenerator`], and one concrete
//! implementation, [`LlmService`], which is built once at process start and
//! handed to every consumer behind an `Arc`. Provider clients (Gemini, OpenAI,
//! Ollama) live under [`services`] and share the unified error type in
//! [`error_handler`].

pub mod config;
pub mod error_handler;
pub mod generator;
pub mod llm_service;
pub mod services;

pub use config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
pub use error_handler::{AiLlmError, ConfigError, ProviderError, ProviderErrorKind};
pub use generator::{GenerateFuture, TextGenerator};
pub use llm_service::LlmService;
