//! Per-call time limits.
//!
//! [`TimeBounded`] wraps a provider so every call it makes is bounded by the
//! same limit. An elapsed call fails exactly like a provider error; nothing
//! is retried. Dropping the returned future abandons the in-flight request.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use mriynyk_provider::{ChatRequest, CompletionProvider, EmbeddingProvider, OutputSchema};
use mriynyk_shared::{EmbeddingVector, MriynykError, Result};
use tracing::warn;

/// Run a provider call with a time limit.
pub(crate) async fn provider_call<T>(
    limit: Duration,
    call: &'static str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(call, limit_ms = limit.as_millis() as u64, "provider call timed out");
            Err(MriynykError::provider(format!(
                "{call} timed out after {}ms",
                limit.as_millis()
            )))
        }
    }
}

/// Run a corpus store query with a time limit.
///
/// A query that errors on its own keeps its `Storage` error; one that runs
/// out of time fails as a provider error, the same as any other timed call.
pub(crate) async fn store_call<T>(
    limit: Duration,
    call: &'static str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(call, limit_ms = limit.as_millis() as u64, "store query timed out");
            Err(MriynykError::provider(format!(
                "{call} timed out after {}ms",
                limit.as_millis()
            )))
        }
    }
}

/// Provider decorator applying a fixed time limit to every call.
pub struct TimeBounded<P> {
    inner: P,
    limit: Duration,
}

impl<P> TimeBounded<P> {
    pub fn new(inner: P, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl<P: EmbeddingProvider> EmbeddingProvider for TimeBounded<P> {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        provider_call(self.limit, "embedding", self.inner.embed(text)).await
    }
}

#[async_trait]
impl<P: CompletionProvider> CompletionProvider for TimeBounded<P> {
    async fn chat(&self, request: &ChatRequest<'_>) -> Result<Option<String>> {
        provider_call(self.limit, "chat completion", self.inner.chat(request)).await
    }

    async fn structured(
        &self,
        prompt: &str,
        schema: &OutputSchema,
    ) -> Result<Option<serde_json::Value>> {
        provider_call(
            self.limit,
            "structured completion",
            self.inner.structured(prompt, schema),
        )
        .await
    }
}
