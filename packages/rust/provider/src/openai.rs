//! OpenAI-compatible HTTP client (`/embeddings`, `/chat/completions`).

use std::time::Duration;

use async_trait::async_trait;
use mriynyk_shared::{AppConfig, EmbeddingVector, MriynykError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::{ChatRequest, CompletionProvider, EmbeddingProvider, OutputSchema};

/// User-Agent string for provider requests.
const USER_AGENT: &str = concat!("Mriynyk/", env!("CARGO_PKG_VERSION"));

/// Connection settings for [`OpenAiClient`].
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub base_url: String,
    pub api_key: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub structured_model: String,
    /// Transport-level timeout for every request.
    pub timeout: Duration,
}

impl OpenAiSettings {
    /// Build settings from the loaded config and an already-resolved API key.
    pub fn from_config(config: &AppConfig, api_key: String) -> Self {
        Self {
            base_url: config.provider.base_url.clone(),
            api_key,
            embedding_model: config.provider.embedding_model.clone(),
            chat_model: config.provider.chat_model.clone(),
            structured_model: config.provider.workbook_model.clone(),
            timeout: config.pipeline.stage_timeout(),
        }
    }
}

/// Embedding and completion client for OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    embedding_model: String,
    chat_model: String,
    structured_model: String,
}

impl OpenAiClient {
    pub fn new(settings: OpenAiSettings) -> Result<Self> {
        if settings.api_key.trim().is_empty() {
            return Err(MriynykError::config("provider API key must not be empty"));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| MriynykError::provider(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.trim().to_string(),
            embedding_model: settings.embedding_model,
            chat_model: settings.chat_model,
            structured_model: settings.structured_model,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// POST a JSON body and decode the JSON response, mapping every failure
    /// to a provider error.
    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let url = self.endpoint(path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(%url, error = %e, "provider request failed");
                if e.is_timeout() {
                    MriynykError::provider(format!("{url}: request timed out"))
                } else {
                    MriynykError::provider(format!("{url}: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            error!(%url, %status, "provider returned an error status");
            return Err(MriynykError::provider(format!(
                "{url}: HTTP {status}: {detail}"
            )));
        }

        response.json::<R>().await.map_err(|e| {
            MriynykError::provider(format!("{url}: malformed response body: {e}"))
        })
    }

    async fn chat_completion(&self, body: &ChatBody<'_>) -> Result<Option<String>> {
        let parsed: ChatResponse = self.post_json("chat/completions", body).await?;
        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message);

        match message {
            Some(message) => {
                if let Some(refusal) = message.refusal.as_deref() {
                    debug!(refusal, "model refused the request");
                    return Ok(None);
                }
                Ok(message.content.filter(|c| !c.trim().is_empty()))
            }
            None => Ok(None),
        }
    }
}

// ── Request/response types ─────────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingBody<'a> {
    model: &'a str,
    input: &'a str,
    encoding_format: &'static str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    schema: &'a serde_json::Value,
    strict: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── Trait implementations ──────────────────────────────────────────

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.embedding_model, text_len = text.len()))]
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        if text.trim().is_empty() {
            return Err(MriynykError::validation("cannot embed empty text"));
        }

        let body = EmbeddingBody {
            model: &self.embedding_model,
            input: text,
            encoding_format: "float",
        };
        let parsed: EmbeddingResponse = self.post_json("embeddings", &body).await?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| MriynykError::provider("embedding response contained no vector"))?;

        debug!(dimensions = vector.len(), "embedded text");
        Ok(vector)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.chat_model))]
    async fn chat(&self, request: &ChatRequest<'_>) -> Result<Option<String>> {
        let body = ChatBody {
            model: &self.chat_model,
            messages: [ChatMessage {
                role: "user",
                content: request.prompt,
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: None,
        };
        self.chat_completion(&body).await
    }

    #[instrument(skip_all, fields(model = %self.structured_model, schema = %schema.name))]
    async fn structured(
        &self,
        prompt: &str,
        schema: &OutputSchema,
    ) -> Result<Option<serde_json::Value>> {
        let body = ChatBody {
            model: &self.structured_model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: None,
            max_tokens: None,
            response_format: Some(ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: &schema.name,
                    schema: &schema.schema,
                    strict: true,
                },
            }),
        };

        let Some(content) = self.chat_completion(&body).await? else {
            return Ok(None);
        };

        let value: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
            MriynykError::provider(format!("structured output is not valid JSON: {e}"))
        })?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(value))
    }
}
