//! Topic disambiguation: pick one candidate topic by position.

use mriynyk_provider::{ChatRequest, CompletionProvider};
use mriynyk_shared::{MriynykError, Result, Topic};
use tracing::{debug, instrument};

use crate::prompts;

/// Parse a model's selection as an index into a list of `len` items.
///
/// Surrounding whitespace is ignored. Anything that is not an integer in
/// `[0, len)` is rejected; the index is never clamped.
pub fn parse_selection(raw: &str, len: usize) -> Result<usize> {
    let trimmed = raw.trim();
    let value: i64 = trimmed.parse().map_err(|_| {
        MriynykError::disambiguation(format!("model answered '{trimmed}', expected an index"))
    })?;

    usize::try_from(value)
        .ok()
        .filter(|index| *index < len)
        .ok_or_else(|| {
            MriynykError::disambiguation(format!(
                "model selected {value}, expected an index in [0, {len})"
            ))
        })
}

/// Ask the model which of `candidates` best matches `query`.
///
/// Returns a position in `candidates`. The caller must pass candidates in a
/// stable order for the result to be reproducible.
#[instrument(skip_all, fields(candidates = candidates.len()))]
pub async fn disambiguate<C: CompletionProvider + ?Sized>(
    completion: &C,
    query: &str,
    candidates: &[Topic],
) -> Result<usize> {
    if candidates.is_empty() {
        return Err(MriynykError::not_found("no candidate topics to choose from"));
    }

    let prompt = prompts::topic_selection(query, candidates);
    let reply = completion
        .chat(&ChatRequest::new(&prompt))
        .await?
        .ok_or_else(|| MriynykError::disambiguation("model returned no selection"))?;

    let index = parse_selection(&reply, candidates.len())?;
    debug!(index, topic = %candidates[index], "disambiguated");
    Ok(index)
}
