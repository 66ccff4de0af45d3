//! Embedding and completion providers.
//!
//! Two capability traits sit at the seam between the retrieval core and the
//! outside world:
//! - [`EmbeddingProvider`]: text → vector
//! - [`CompletionProvider`]: free-form chat text, or JSON constrained to a schema
//!
//! [`OpenAiClient`] implements both against any OpenAI-compatible HTTP API.
//! No component here retries; a failed or timed-out call is a provider error.

mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use mriynyk_shared::{EmbeddingVector, Result};

pub use openai::{OpenAiClient, OpenAiSettings};

/// Maps text to a fixed-length vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single non-empty text.
    async fn embed(&self, text: &str) -> Result<EmbeddingVector>;
}

/// A single-turn chat request.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub prompt: &'a str,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl<'a> ChatRequest<'a> {
    pub fn new(prompt: &'a str) -> Self {
        Self {
            prompt,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A named JSON schema the provider must conform its output to.
#[derive(Debug, Clone)]
pub struct OutputSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

/// Generative completion calls.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Free-form chat completion. `None` when the model returned no content.
    async fn chat(&self, request: &ChatRequest<'_>) -> Result<Option<String>>;

    /// Completion constrained to `schema`, returned already parsed.
    /// `None` when the model returned no content (e.g. a refusal).
    async fn structured(
        &self,
        prompt: &str,
        schema: &OutputSchema,
    ) -> Result<Option<serde_json::Value>>;
}

#[async_trait]
impl<T: EmbeddingProvider + ?Sized> EmbeddingProvider for Arc<T> {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        (**self).embed(text).await
    }
}

#[async_trait]
impl<T: CompletionProvider + ?Sized> CompletionProvider for Arc<T> {
    async fn chat(&self, request: &ChatRequest<'_>) -> Result<Option<String>> {
        (**self).chat(request).await
    }

    async fn structured(
        &self,
        prompt: &str,
        schema: &OutputSchema,
    ) -> Result<Option<serde_json::Value>> {
        (**self).structured(prompt, schema).await
    }
}
