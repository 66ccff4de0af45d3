//! Direct free-form explanation of a query.

use mriynyk_provider::{ChatRequest, CompletionProvider};
use mriynyk_shared::{Discipline, Grade, MriynykError, ProviderConfig, Result};
use tracing::{debug, instrument};

use crate::prompts;

/// Sampling options for the direct explanation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplainOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ExplainOptions {
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            max_tokens: config.explain_max_tokens,
            temperature: config.temperature,
        }
    }
}

impl Default for ExplainOptions {
    fn default() -> Self {
        Self::from_config(&ProviderConfig::default())
    }
}

/// Short explanation of `query` for a student of `grade`.
///
/// Empty output is a provider error since nothing downstream can use it.
#[instrument(skip_all, fields(%grade, discipline = %discipline))]
pub async fn explain_directly<C: CompletionProvider + ?Sized>(
    completion: &C,
    query: &str,
    grade: Grade,
    discipline: Discipline,
    options: ExplainOptions,
) -> Result<String> {
    let prompt = prompts::direct_explanation(query, grade, discipline);
    let request = ChatRequest::new(&prompt)
        .with_temperature(options.temperature)
        .with_max_tokens(options.max_tokens);

    let text = completion
        .chat(&request)
        .await?
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| MriynykError::provider("model returned an empty explanation"))?;

    debug!(chars = text.chars().count(), "direct explanation");
    Ok(text)
}
