use std::{future::Future, pin::Pin};

use crate::error_handler::AiLlmError;

/// Boxed future returned by [`TextGenerator::generate`].
pub type GenerateFuture<'a> = Pin<Box<dyn Future<Output = Result<String, AiLlmError>> + Send + 'a>>;

/// Provider interface for prompt → text generation.
///
/// Implement this trait to plug in a backend (or a stub in tests). The
/// returned text is the primary payload of the response, unmodified.
pub trait TextGenerator: Send + Sync {
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a>;
}
