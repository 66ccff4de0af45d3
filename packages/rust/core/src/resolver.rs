//! Topic resolution strategies.
//!
//! A [`TopicResolver`] turns a free-text query into one corpus topic. The
//! strategy is chosen when the pipeline is built:
//! - [`EmbeddingFirstResolver`]: explain, embed, nearest row's topic
//! - [`DisambiguatingResolver`]: list candidates, let the model pick one

use std::sync::Arc;

use async_trait::async_trait;
use mriynyk_provider::{CompletionProvider, EmbeddingProvider};
use mriynyk_shared::{Discipline, Grade, Result, Topic};
use tracing::{info, instrument};

use crate::directory::TopicDirectory;
use crate::disambiguator::disambiguate;
use crate::explain::{ExplainOptions, explain_directly};

/// Resolves a query to a topic drawn from the corpus.
#[async_trait]
pub trait TopicResolver: Send + Sync {
    async fn resolve(&self, query: &str, grade: Grade, discipline: Discipline) -> Result<Topic>;

    /// Short strategy name for logs.
    fn name(&self) -> &'static str;
}

/// Explain the query, embed the explanation, take the nearest row's topic.
pub struct EmbeddingFirstResolver {
    directory: TopicDirectory,
    embedder: Arc<dyn EmbeddingProvider>,
    completion: Arc<dyn CompletionProvider>,
    explain: ExplainOptions,
}

impl EmbeddingFirstResolver {
    pub fn new(
        directory: TopicDirectory,
        embedder: Arc<dyn EmbeddingProvider>,
        completion: Arc<dyn CompletionProvider>,
        explain: ExplainOptions,
    ) -> Self {
        Self {
            directory,
            embedder,
            completion,
            explain,
        }
    }
}

#[async_trait]
impl TopicResolver for EmbeddingFirstResolver {
    #[instrument(skip_all, fields(strategy = "embedding-first"))]
    async fn resolve(&self, query: &str, grade: Grade, discipline: Discipline) -> Result<Topic> {
        let explanation =
            explain_directly(self.completion.as_ref(), query, grade, discipline, self.explain)
                .await?;
        let vector = self.embedder.embed(&explanation).await?;
        let topic = self
            .directory
            .nearest_topic(grade, discipline, &vector)
            .await?;
        info!(topic = %topic, "resolved topic");
        Ok(topic)
    }

    fn name(&self) -> &'static str {
        "embedding-first"
    }
}

/// List the candidate topics and let the model choose by index.
pub struct DisambiguatingResolver {
    directory: TopicDirectory,
    completion: Arc<dyn CompletionProvider>,
}

impl DisambiguatingResolver {
    pub fn new(directory: TopicDirectory, completion: Arc<dyn CompletionProvider>) -> Self {
        Self {
            directory,
            completion,
        }
    }
}

#[async_trait]
impl TopicResolver for DisambiguatingResolver {
    #[instrument(skip_all, fields(strategy = "enumerate-then-disambiguate"))]
    async fn resolve(&self, query: &str, grade: Grade, discipline: Discipline) -> Result<Topic> {
        let mut candidates = self.directory.candidate_topics(grade, discipline).await?;
        let index = disambiguate(self.completion.as_ref(), query, &candidates).await?;
        let topic = candidates.swap_remove(index);
        info!(topic = %topic, "resolved topic");
        Ok(topic)
    }

    fn name(&self) -> &'static str {
        "enumerate-then-disambiguate"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use mriynyk_shared::MriynykError;

    use super::*;
    use crate::testing::{FixedEmbedder, ScriptedCompletion, SeedRow, TestCorpus, seeded_storage};

    async fn algebra_corpus() -> TestCorpus {
        seeded_storage(&[
            SeedRow::new(Grade::Eighth, Discipline::Algebra, "Fractions").embedding([1.0, 0.0, 0.0]),
            SeedRow::new(Grade::Eighth, Discipline::Algebra, "Linear equations")
                .embedding([0.0, 1.0, 0.0]),
            SeedRow::new(Grade::Eighth, Discipline::Algebra, "Word problems")
                .embedding([0.0, 0.0, 1.0]),
        ])
        .await
    }

    fn directory(corpus: &TestCorpus) -> TopicDirectory {
        TopicDirectory::new(corpus.handle(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn embedding_first_embeds_the_explanation() {
        let corpus = algebra_corpus().await;
        let embedder = Arc::new(FixedEmbedder::new([0.0, 0.1, 0.9]));
        let completion = Arc::new(ScriptedCompletion::new().chat_reply("задачі на рух"));
        let resolver = EmbeddingFirstResolver::new(
            directory(&corpus),
            embedder.clone(),
            completion.clone(),
            ExplainOptions::default(),
        );

        let topic = resolver
            .resolve("скільки часу їде потяг", Grade::Eighth, Discipline::Algebra)
            .await
            .unwrap();
        assert_eq!(topic.as_str(), "Word problems");
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(completion.chat_count(), 1);
    }

    #[tokio::test]
    async fn disambiguating_resolver_returns_selected_candidate() {
        let corpus = algebra_corpus().await;
        let completion = Arc::new(ScriptedCompletion::new().chat_reply("1"));
        let resolver = DisambiguatingResolver::new(directory(&corpus), completion);

        let topic = resolver
            .resolve("solve 2x = 4", Grade::Eighth, Discipline::Algebra)
            .await
            .unwrap();
        assert_eq!(topic.as_str(), "Linear equations");
    }

    #[tokio::test]
    async fn disambiguating_resolver_rejects_bad_selection() {
        let corpus = algebra_corpus().await;
        for reply in ["7", "abc"] {
            let completion = Arc::new(ScriptedCompletion::new().chat_reply(reply));
            let resolver = DisambiguatingResolver::new(directory(&corpus), completion);
            let err = resolver
                .resolve("solve 2x = 4", Grade::Eighth, Discipline::Algebra)
                .await
                .unwrap_err();
            assert!(matches!(err, MriynykError::Disambiguation { .. }), "{reply}");
        }
    }

    #[tokio::test]
    async fn empty_filter_fails_before_the_model() {
        let corpus = algebra_corpus().await;
        let completion = Arc::new(ScriptedCompletion::new().chat_reply("0"));
        let resolver = DisambiguatingResolver::new(directory(&corpus), completion.clone());
        let err = resolver
            .resolve("козаки", Grade::Ninth, Discipline::UkrainianHistory)
            .await
            .unwrap_err();
        assert!(matches!(err, MriynykError::NotFound(_)));
        assert_eq!(completion.chat_count(), 0);
    }
}
