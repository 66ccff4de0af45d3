//! End-to-end answer pipeline: query → topic → ordered pages → workbook.
//!
//! The pipeline is a straight line with no retries:
//! `RESOLVE_TOPIC → ASSEMBLE_PAGES → GENERATE → DONE`. Any stage error
//! aborts the run and is returned unchanged; no partial workbook escapes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};
use uuid::Uuid;

use mriynyk_provider::{CompletionProvider, EmbeddingProvider, OpenAiClient, OpenAiSettings};
use mriynyk_shared::{
    AppConfig, Discipline, Grade, MriynykError, ResolveStrategy, Result, Topic, TopicRequest,
    TopicResponse, Workbook,
};
use mriynyk_storage::Storage;

use crate::assembler;
use crate::bounded::TimeBounded;
use crate::directory::TopicDirectory;
use crate::explain::ExplainOptions;
use crate::resolver::{DisambiguatingResolver, EmbeddingFirstResolver, TopicResolver};
use crate::solver::QuestionSolver;
use crate::workbook;

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct AnswerResult {
    /// Correlation id for the run's log lines.
    pub request_id: Uuid,
    /// Topic the query resolved to.
    pub topic: Topic,
    /// Number of pages the workbook was grounded on.
    pub page_count: usize,
    /// Generated artifact.
    pub workbook: Workbook,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, result: &AnswerResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _result: &AnswerResult) {}
}

/// A configured pipeline. Cheap to share; holds no per-request state.
pub struct Pipeline {
    resolver: Box<dyn TopicResolver>,
    storage: Arc<Storage>,
    embedder: Arc<dyn EmbeddingProvider>,
    completion: Arc<dyn CompletionProvider>,
    explain: ExplainOptions,
    limit: Duration,
}

impl Pipeline {
    /// Build a pipeline with the given strategy over already-constructed
    /// providers. Every provider call and store query is bounded by `limit`.
    pub fn new(
        strategy: ResolveStrategy,
        storage: Arc<Storage>,
        embedder: Arc<dyn EmbeddingProvider>,
        completion: Arc<dyn CompletionProvider>,
        explain: ExplainOptions,
        limit: Duration,
    ) -> Self {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(TimeBounded::new(embedder, limit));
        let completion: Arc<dyn CompletionProvider> =
            Arc::new(TimeBounded::new(completion, limit));
        let directory = TopicDirectory::new(storage.clone(), limit);

        let resolver: Box<dyn TopicResolver> = match strategy {
            ResolveStrategy::EmbeddingFirst => Box::new(EmbeddingFirstResolver::new(
                directory,
                embedder.clone(),
                completion.clone(),
                explain,
            )),
            ResolveStrategy::EnumerateThenDisambiguate => {
                Box::new(DisambiguatingResolver::new(directory, completion.clone()))
            }
        };

        Self {
            resolver,
            storage,
            embedder,
            completion,
            explain,
            limit,
        }
    }

    /// Build a pipeline backed by the OpenAI-compatible HTTP client.
    pub fn from_config(config: &AppConfig, storage: Arc<Storage>, api_key: String) -> Result<Self> {
        let client = Arc::new(OpenAiClient::new(OpenAiSettings::from_config(config, api_key))?);
        Ok(Self::new(
            config.pipeline.strategy,
            storage,
            client.clone(),
            client,
            ExplainOptions::from_config(&config.provider),
            config.pipeline.stage_timeout(),
        ))
    }

    /// Name of the configured resolution strategy.
    pub fn strategy(&self) -> &'static str {
        self.resolver.name()
    }

    /// Solver sharing this pipeline's providers and limits.
    pub fn question_solver(&self) -> QuestionSolver {
        QuestionSolver::new(
            self.storage.clone(),
            self.embedder.clone(),
            self.completion.clone(),
            self.explain,
            self.limit,
        )
    }

    /// Answer a topic query with a generated workbook.
    #[instrument(
        skip_all,
        fields(
            request_id = tracing::field::Empty,
            %grade,
            discipline = %discipline,
            strategy = self.strategy(),
        )
    )]
    pub async fn answer_topic(
        &self,
        query: &str,
        grade: Grade,
        discipline: Discipline,
        student_info: Option<&str>,
        progress: &dyn ProgressReporter,
    ) -> Result<AnswerResult> {
        let start = Instant::now();
        let request_id = Uuid::now_v7();
        tracing::Span::current().record("request_id", tracing::field::display(request_id));

        if query.trim().is_empty() {
            return Err(MriynykError::validation("query must not be empty"));
        }

        info!("starting answer pipeline");

        // --- Phase 1: Resolve topic ---
        progress.phase("Resolving topic");
        let topic = self
            .resolver
            .resolve(query, grade, discipline)
            .await
            .inspect_err(|e| warn!(error = %e, stage = "resolve", "pipeline failed"))?;

        // --- Phase 2: Assemble pages ---
        progress.phase("Assembling chapter");
        let pages = assembler::assemble_pages(&self.storage, &topic, grade, discipline, self.limit)
            .await
            .inspect_err(|e| warn!(error = %e, stage = "assemble", "pipeline failed"))?;

        // --- Phase 3: Generate ---
        progress.phase("Generating workbook");
        let workbook = workbook::generate(
            self.completion.as_ref(),
            query,
            discipline,
            &pages,
            student_info,
        )
        .await
        .inspect_err(|e| warn!(error = %e, stage = "generate", "pipeline failed"))?;

        let result = AnswerResult {
            request_id,
            topic,
            page_count: pages.len(),
            workbook,
            elapsed: start.elapsed(),
        };

        progress.done(&result);

        info!(
            topic = %result.topic,
            page_count = result.page_count,
            elapsed_ms = result.elapsed.as_millis(),
            "answer pipeline complete"
        );

        Ok(result)
    }

    /// Answer a boundary request.
    pub async fn answer_request(
        &self,
        request: &TopicRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<TopicResponse> {
        let student_info = Some(request.student_info.as_str()).filter(|s| !s.trim().is_empty());
        let result = self
            .answer_topic(
                &request.query,
                request.grade,
                request.discipline,
                student_info,
                progress,
            )
            .await?;
        Ok(result.workbook.into())
    }
}
