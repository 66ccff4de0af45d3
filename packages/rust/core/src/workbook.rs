//! Workbook generation over an assembled chapter.

use mriynyk_provider::{CompletionProvider, OutputSchema};
use mriynyk_shared::{Discipline, MriynykError, Page, Result, Workbook};
use serde_json::json;
use tracing::{info, instrument};

use crate::prompts;

/// JSON schema the completion provider must conform its output to.
pub fn workbook_schema() -> OutputSchema {
    OutputSchema {
        name: "workbook".to_string(),
        schema: json!({
            "type": "object",
            "properties": {
                "markdown_text": { "type": "string" },
                "quiz_questions": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "question": { "type": "string" },
                            "options": {
                                "type": "array",
                                "items": { "type": "string" }
                            },
                            "correct_option_index": { "type": "integer", "minimum": 0 }
                        },
                        "required": ["question", "options", "correct_option_index"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["markdown_text", "quiz_questions"],
            "additionalProperties": false
        }),
    }
}

/// Page texts in order, one per line.
pub fn chapter_text(pages: &[Page]) -> String {
    pages
        .iter()
        .map(|page| page.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Generate a workbook for `query` grounded in `pages`.
///
/// A missing result is a `Generation` error; a result that does not fit
/// the workbook shape is a malformed provider response.
#[instrument(skip_all, fields(discipline = %discipline, pages = pages.len()))]
pub async fn generate<C: CompletionProvider + ?Sized>(
    completion: &C,
    query: &str,
    discipline: Discipline,
    pages: &[Page],
    student_info: Option<&str>,
) -> Result<Workbook> {
    let chapter = chapter_text(pages);
    let prompt = prompts::workbook(query, discipline, &chapter, student_info.unwrap_or(""));

    let value = completion
        .structured(&prompt, &workbook_schema())
        .await?
        .ok_or_else(|| MriynykError::generation("model returned no workbook"))?;

    let workbook: Workbook = serde_json::from_value(value)
        .map_err(|e| MriynykError::provider(format!("malformed workbook response: {e}")))?;

    info!(questions = workbook.quiz_questions.len(), "generated workbook");
    Ok(workbook)
}
