//! Topic directory: which topics exist for a (grade, discipline) pair.

use std::sync::Arc;
use std::time::Duration;

use mriynyk_shared::{Discipline, Grade, MriynykError, Result, Topic};
use mriynyk_storage::Storage;
use tracing::{debug, instrument};

use crate::bounded::store_call;

/// Read-only view over the corpus topics.
#[derive(Clone)]
pub struct TopicDirectory {
    storage: Arc<Storage>,
    limit: Duration,
}

impl TopicDirectory {
    pub fn new(storage: Arc<Storage>, limit: Duration) -> Self {
        Self { storage, limit }
    }

    /// Topic of the single row nearest to `vector` within the filter.
    ///
    /// Fails with `NotFound` when no row matches (grade, discipline).
    #[instrument(skip_all, fields(%grade, discipline = %discipline))]
    pub async fn nearest_topic(
        &self,
        grade: Grade,
        discipline: Discipline,
        vector: &[f32],
    ) -> Result<Topic> {
        let label = store_call(
            self.limit,
            "nearest topic query",
            self.storage
                .nearest_topic(grade.value(), discipline.label(), vector),
        )
        .await?
        .ok_or_else(|| {
            MriynykError::not_found(format!(
                "no corpus rows for grade {grade}, discipline {discipline}"
            ))
        })?;

        debug!(topic = %label, "nearest topic");
        Ok(Topic::new(label))
    }

    /// Distinct topics for the filter, in the store's listing order.
    ///
    /// Fails with `NotFound` when the set is empty.
    #[instrument(skip_all, fields(%grade, discipline = %discipline))]
    pub async fn candidate_topics(&self, grade: Grade, discipline: Discipline) -> Result<Vec<Topic>> {
        let labels = store_call(
            self.limit,
            "topic listing query",
            self.storage.list_topics(grade.value(), discipline.label()),
        )
        .await?;

        if labels.is_empty() {
            return Err(MriynykError::not_found(format!(
                "no topics for grade {grade}, discipline {discipline}"
            )));
        }

        debug!(count = labels.len(), "candidate topics");
        Ok(labels.into_iter().map(Topic::new).collect())
    }
}
