//! SQL migration definitions for the corpus database.
//!
//! Migrations are applied in order on database open. The embedding column
//! width is fixed when the schema is first created.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: String,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations(embedding_dimensions: usize) -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: corpus_pages with vector column",
        sql: format!(
            r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Curriculum passages, one row per book page
CREATE TABLE IF NOT EXISTS corpus_pages (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    grade         INTEGER NOT NULL,
    discipline    TEXT NOT NULL,
    topic_title   TEXT NOT NULL,
    page_text     TEXT NOT NULL,
    page_metadata TEXT,
    embedding     F32_BLOB({embedding_dimensions})
);

CREATE INDEX IF NOT EXISTS idx_corpus_scope ON corpus_pages(grade, discipline);
CREATE INDEX IF NOT EXISTS idx_corpus_topic ON corpus_pages(grade, discipline, topic_title);

INSERT INTO schema_migrations (version) VALUES (1);
"#
        ),
    }]
}
