//! Multiple-choice question solver grounded on the nearest corpus page.

use std::sync::Arc;
use std::time::Duration;

use mriynyk_provider::{ChatRequest, CompletionProvider, EmbeddingProvider};
use mriynyk_shared::{Discipline, Grade, MriynykError, Result};
use mriynyk_storage::Storage;
use tracing::{info, instrument};

use crate::bounded::store_call;
use crate::disambiguator::parse_selection;
use crate::explain::{ExplainOptions, explain_directly};
use crate::prompts;

/// Answers multiple-choice questions with one page of corpus context.
pub struct QuestionSolver {
    storage: Arc<Storage>,
    embedder: Arc<dyn EmbeddingProvider>,
    completion: Arc<dyn CompletionProvider>,
    explain: ExplainOptions,
    limit: Duration,
}

impl QuestionSolver {
    pub fn new(
        storage: Arc<Storage>,
        embedder: Arc<dyn EmbeddingProvider>,
        completion: Arc<dyn CompletionProvider>,
        explain: ExplainOptions,
        limit: Duration,
    ) -> Self {
        Self {
            storage,
            embedder,
            completion,
            explain,
            limit,
        }
    }

    /// Index of the choice the model considers correct.
    ///
    /// An unparseable or out-of-range answer is a `Disambiguation` error.
    #[instrument(skip_all, fields(%grade, discipline = %discipline, choices = choices.len()))]
    pub async fn solve(
        &self,
        question: &str,
        choices: &[String],
        grade: Grade,
        discipline: Discipline,
    ) -> Result<usize> {
        if question.trim().is_empty() {
            return Err(MriynykError::validation("question must not be empty"));
        }
        if choices.is_empty() {
            return Err(MriynykError::validation("at least one choice is required"));
        }

        let explanation = explain_directly(
            self.completion.as_ref(),
            question,
            grade,
            discipline,
            self.explain,
        )
        .await?;
        let vector = self.embedder.embed(&explanation).await?;

        let context = store_call(
            self.limit,
            "nearest page query",
            self.storage
                .nearest_page_text(grade.value(), discipline.label(), &vector),
        )
        .await?
        .ok_or_else(|| {
            MriynykError::not_found(format!(
                "no corpus rows for grade {grade}, discipline {discipline}"
            ))
        })?;

        let prompt = prompts::question_answer(question, choices, &context);
        let reply = self
            .completion
            .chat(&ChatRequest::new(&prompt))
            .await?
            .ok_or_else(|| MriynykError::disambiguation("model returned no answer"))?;

        let index = parse_selection(&reply, choices.len())?;
        info!(index, "solved question");
        Ok(index)
    }
}
