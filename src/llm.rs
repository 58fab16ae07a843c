//! Generation API abstraction
//!
//! The remote model is a black box reached through two calls: text-only and
//! image-plus-text.

mod config;
mod error;
mod gemini;
mod types;

pub use config::LlmConfig;
#[allow(unused_imports)] // Public API re-exports
pub use error::{LlmError, LlmErrorKind};
pub use gemini::GeminiService;
#[allow(unused_imports)] // Public API re-exports
pub use types::{Generation, Usage};

use crate::state_machine::Attachment;
use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for generation providers
#[async_trait]
pub trait GenerationApi: Send + Sync {
    /// Generate a reply to a text prompt
    async fn generate_text(&self, prompt: &str) -> Result<Generation, LlmError>;

    /// Generate a reply to an image and a text prompt
    async fn generate_multimodal(
        &self,
        image: &Attachment,
        prompt: &str,
    ) -> Result<Generation, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: GenerationApi + ?Sized> GenerationApi for Arc<T> {
    async fn generate_text(&self, prompt: &str) -> Result<Generation, LlmError> {
        (**self).generate_text(prompt).await
    }

    async fn generate_multimodal(
        &self,
        image: &Attachment,
        prompt: &str,
    ) -> Result<Generation, LlmError> {
        (**self).generate_multimodal(image, prompt).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Logging wrapper for generation providers
pub struct LoggingService {
    inner: Arc<dyn GenerationApi>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn GenerationApi>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }

    fn log_result(&self, call: &str, start: std::time::Instant, result: &Result<Generation, LlmError>) {
        let duration = start.elapsed();

        match result {
            Ok(generation) => {
                tracing::info!(
                    model = %self.model_id,
                    call,
                    duration_ms = %duration.as_millis(),
                    input_tokens = generation.usage.input_tokens,
                    output_tokens = generation.usage.output_tokens,
                    finish_reason = generation.finish_reason.as_deref().unwrap_or("none"),
                    "Generation request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    call,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "Generation request failed"
                );
            }
        }
    }
}

#[async_trait]
impl GenerationApi for LoggingService {
    async fn generate_text(&self, prompt: &str) -> Result<Generation, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.generate_text(prompt).await;
        self.log_result("text", start, &result);
        result
    }

    async fn generate_multimodal(
        &self,
        image: &Attachment,
        prompt: &str,
    ) -> Result<Generation, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.generate_multimodal(image, prompt).await;
        self.log_result("multimodal", start, &result);
        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Build the production provider from configuration
pub fn build_service(config: &LlmConfig) -> Result<Arc<dyn GenerationApi>, LlmError> {
    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| LlmError::auth("GEMINI_API_KEY is not set"))?;
    let gemini: Arc<dyn GenerationApi> = Arc::new(GeminiService::new(api_key, config)?);
    Ok(Arc::new(LoggingService::new(gemini)))
}
