//! In-memory providers and a seeded corpus for unit tests.

use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mriynyk_provider::{ChatRequest, CompletionProvider, EmbeddingProvider, OutputSchema};
use mriynyk_shared::{Discipline, EmbeddingVector, Grade, MriynykError, Result};
use mriynyk_storage::{NewCorpusRow, Storage};
use tempfile::TempDir;

pub const DIMS: usize = 3;

/// One row to seed into a fresh test store.
pub struct SeedRow {
    grade: Grade,
    discipline: Discipline,
    topic: String,
    text: String,
    metadata: Option<String>,
    embedding: Option<[f32; DIMS]>,
}

impl SeedRow {
    pub fn new(grade: Grade, discipline: Discipline, topic: &str) -> Self {
        Self {
            grade,
            discipline,
            topic: topic.to_string(),
            text: format!("text of {topic}"),
            metadata: None,
            embedding: None,
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn metadata(mut self, metadata: &str) -> Self {
        self.metadata = Some(metadata.to_string());
        self
    }

    pub fn embedding(mut self, embedding: [f32; DIMS]) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// A seeded store living in its own temp directory.
///
/// The directory is removed on drop, so keep the corpus alive for as long
/// as any handle from [`TestCorpus::handle`] is in use.
pub struct TestCorpus {
    storage: Arc<Storage>,
    _dir: TempDir,
}

impl TestCorpus {
    pub fn handle(&self) -> Arc<Storage> {
        self.storage.clone()
    }
}

impl Deref for TestCorpus {
    type Target = Storage;

    fn deref(&self) -> &Storage {
        &self.storage
    }
}

/// Fresh temp-dir store populated with `rows`, in order.
pub async fn seeded_storage(rows: &[SeedRow]) -> TestCorpus {
    let dir = TempDir::new().expect("create temp dir");
    let storage = Storage::open(&dir.path().join("corpus.db"), DIMS)
        .await
        .expect("open test db");
    for row in rows {
        storage
            .insert_page(&NewCorpusRow {
                grade: row.grade.value(),
                discipline: row.discipline.label(),
                topic_title: &row.topic,
                page_text: &row.text,
                page_metadata: row.metadata.as_deref(),
                embedding: row.embedding.as_ref().map(|v| v.as_slice()),
            })
            .await
            .expect("seed row");
    }
    TestCorpus {
        storage: Arc::new(storage),
        _dir: dir,
    }
}

/// Embedder returning the same vector for every text.
pub struct FixedEmbedder {
    vector: EmbeddingVector,
    pub calls: AtomicUsize,
}

impl FixedEmbedder {
    pub fn new(vector: [f32; DIMS]) -> Self {
        Self {
            vector: vector.to_vec(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<EmbeddingVector> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector.clone())
    }
}

/// Completion provider replaying queued responses.
///
/// Chat responses are consumed in order; when the queue runs dry the last
/// response repeats. Every structured call returns the same value.
#[derive(Default)]
pub struct ScriptedCompletion {
    chat: Mutex<VecDeque<Option<String>>>,
    last_chat: Mutex<Option<String>>,
    structured: Option<serde_json::Value>,
    pub prompts: Mutex<Vec<String>>,
    pub chat_calls: AtomicUsize,
    pub structured_calls: AtomicUsize,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chat_reply(self, reply: impl Into<String>) -> Self {
        self.push_chat(Some(reply.into()))
    }

    pub fn chat_empty(self) -> Self {
        self.push_chat(None)
    }

    fn push_chat(self, reply: Option<String>) -> Self {
        self.chat.lock().expect("lock").push_back(reply);
        self
    }

    pub fn structured_reply(mut self, value: serde_json::Value) -> Self {
        self.structured = Some(value);
        self
    }

    pub fn chat_count(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn structured_count(&self) -> usize {
        self.structured_calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> String {
        self.prompts
            .lock()
            .expect("lock")
            .last()
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    async fn chat(&self, request: &ChatRequest<'_>) -> Result<Option<String>> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().expect("lock").push(request.prompt.to_string());
        let next = self.chat.lock().expect("lock").pop_front();
        let mut last = self.last_chat.lock().expect("lock");
        match next {
            Some(reply) => {
                *last = reply.clone();
                Ok(reply)
            }
            None => Ok(last.clone()),
        }
    }

    async fn structured(
        &self,
        prompt: &str,
        _schema: &OutputSchema,
    ) -> Result<Option<serde_json::Value>> {
        self.structured_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().expect("lock").push(prompt.to_string());
        Ok(self.structured.clone())
    }
}

/// Completion provider whose every call fails.
pub struct FailingCompletion;

#[async_trait]
impl CompletionProvider for FailingCompletion {
    async fn chat(&self, _request: &ChatRequest<'_>) -> Result<Option<String>> {
        Err(MriynykError::provider("upstream unavailable"))
    }

    async fn structured(
        &self,
        _prompt: &str,
        _schema: &OutputSchema,
    ) -> Result<Option<serde_json::Value>> {
        Err(MriynykError::provider("upstream unavailable"))
    }
}

/// A structured reply that deserializes into a valid workbook.
pub fn workbook_json() -> serde_json::Value {
    serde_json::json!({
        "markdown_text": "# Лінійні рівняння\n\nРівняння виду ax + b = 0.",
        "quiz_questions": [
            {
                "question": "Розв'яжіть 2x = 4",
                "options": ["1", "2", "3", "4"],
                "correct_option_index": 1
            }
        ]
    })
}
