//! libSQL corpus store.
//!
//! The [`Storage`] struct wraps a libSQL database holding curriculum pages:
//! one row per book page, carrying grade, discipline, topic title, page
//! text, a free-form metadata payload and a page embedding.
//!
//! **Access rules:**
//! - Seeding / tests: read-write via [`Storage::open`]
//! - Request handling: read-only via [`Storage::open_readonly`]
//!
//! All filters are exact matches on grade and discipline.

mod migrations;

use std::path::Path;

use libsql::{Connection, Database, params};
use mriynyk_shared::{MriynykError, Result};
use tracing::debug;

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

/// A corpus row as read back for page assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusRow {
    /// Passage body.
    pub page_text: String,
    /// Raw metadata payload, if the row has one.
    pub page_metadata: Option<String>,
}

/// A corpus row to insert.
#[derive(Debug, Clone)]
pub struct NewCorpusRow<'a> {
    pub grade: u8,
    pub discipline: &'a str,
    pub topic_title: &'a str,
    pub page_text: &'a str,
    pub page_metadata: Option<&'a str>,
    pub embedding: Option<&'a [f32]>,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    ///
    /// `embedding_dimensions` sets the vector column width for a fresh schema.
    pub async fn open(path: &Path, embedding_dimensions: usize) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MriynykError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| MriynykError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| MriynykError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations(embedding_dimensions).await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MriynykError::storage(format!(
                "corpus database not found at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| MriynykError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| MriynykError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self, embedding_dimensions: usize) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations(embedding_dimensions) {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(&migration.sql)
                    .await
                    .map_err(|e| {
                        MriynykError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(MriynykError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert one corpus page. Returns the new row id.
    pub async fn insert_page(&self, row: &NewCorpusRow<'_>) -> Result<i64> {
        self.check_writable()?;
        let embedding = row.embedding.map(vector_literal).transpose()?;
        // Rows without an embedding store NULL, not vector32(NULL).
        let sql = if embedding.is_some() {
            "INSERT INTO corpus_pages (grade, discipline, topic_title, page_text, page_metadata, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, vector32(?6))"
        } else {
            "INSERT INTO corpus_pages (grade, discipline, topic_title, page_text, page_metadata, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
        };
        self.conn
            .execute(
                sql,
                params![
                    i64::from(row.grade),
                    row.discipline,
                    row.topic_title,
                    row.page_text,
                    row.page_metadata,
                    embedding,
                ],
            )
            .await
            .map_err(|e| MriynykError::Storage(e.to_string()))?;
        Ok(self.conn.last_insert_rowid())
    }

    // -----------------------------------------------------------------------
    // Topic queries
    // -----------------------------------------------------------------------

    /// Distinct topic titles for a (grade, discipline) pair, in first-insertion order.
    pub async fn list_topics(&self, grade: u8, discipline: &str) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT topic_title FROM corpus_pages
                 WHERE grade = ?1 AND discipline = ?2
                 GROUP BY topic_title
                 ORDER BY MIN(id)",
                params![i64::from(grade), discipline],
            )
            .await
            .map_err(|e| MriynykError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| MriynykError::Storage(e.to_string()))?
        {
            results.push(
                row.get::<String>(0)
                    .map_err(|e| MriynykError::Storage(e.to_string()))?,
            );
        }
        debug!(grade, discipline, topics = results.len(), "listed topics");
        Ok(results)
    }

    /// Topic title of the row closest to `vector` (cosine distance) within the filter.
    ///
    /// Rows without an embedding sort after every row that has one, so this
    /// only returns `None` when the filter matches nothing.
    pub async fn nearest_topic(
        &self,
        grade: u8,
        discipline: &str,
        vector: &[f32],
    ) -> Result<Option<String>> {
        self.nearest_column("topic_title", grade, discipline, vector)
            .await
    }

    /// Page text of the row closest to `vector` within the filter.
    pub async fn nearest_page_text(
        &self,
        grade: u8,
        discipline: &str,
        vector: &[f32],
    ) -> Result<Option<String>> {
        self.nearest_column("page_text", grade, discipline, vector)
            .await
    }

    async fn nearest_column(
        &self,
        column: &'static str,
        grade: u8,
        discipline: &str,
        vector: &[f32],
    ) -> Result<Option<String>> {
        let literal = vector_literal(vector)?;
        let sql = format!(
            "SELECT {column} FROM corpus_pages
             WHERE grade = ?1 AND discipline = ?2
             ORDER BY CASE WHEN embedding IS NULL THEN NULL
                      ELSE vector_distance_cos(embedding, vector32(?3)) END ASC NULLS LAST,
                      id ASC
             LIMIT 1"
        );
        let mut rows = self
            .conn
            .query(&sql, params![i64::from(grade), discipline, literal])
            .await
            .map_err(|e| MriynykError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(
                row.get::<String>(0)
                    .map_err(|e| MriynykError::Storage(e.to_string()))?,
            )),
            Ok(None) => Ok(None),
            Err(e) => Err(MriynykError::Storage(e.to_string())),
        }
    }

    // -----------------------------------------------------------------------
    // Page queries
    // -----------------------------------------------------------------------

    /// All rows for an exact (topic, grade, discipline) triple, in insertion order.
    pub async fn fetch_topic_rows(
        &self,
        grade: u8,
        discipline: &str,
        topic_title: &str,
    ) -> Result<Vec<CorpusRow>> {
        let mut rows = self
            .conn
            .query(
                "SELECT page_text, page_metadata FROM corpus_pages
                 WHERE grade = ?1 AND discipline = ?2 AND topic_title = ?3
                 ORDER BY id",
                params![i64::from(grade), discipline, topic_title],
            )
            .await
            .map_err(|e| MriynykError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| MriynykError::Storage(e.to_string()))?
        {
            results.push(CorpusRow {
                page_text: row
                    .get::<String>(0)
                    .map_err(|e| MriynykError::Storage(e.to_string()))?,
                page_metadata: row.get::<String>(1).ok(),
            });
        }
        debug!(grade, discipline, topic_title, rows = results.len(), "fetched topic rows");
        Ok(results)
    }
}

/// Render a vector as the JSON text accepted by `vector32()`.
fn vector_literal(vector: &[f32]) -> Result<String> {
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(MriynykError::validation(
            "embedding contains non-finite values",
        ));
    }
    serde_json::to_string(vector).map_err(|e| MriynykError::Storage(e.to_string()))
}
