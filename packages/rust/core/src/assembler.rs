//! Chapter assembler.
//!
//! Turns the corpus rows of one topic into an ordered list of [`Page`]s.
//! Row metadata comes from a loosely controlled ingestion job, so both the
//! page number and the exercise list are recovered best-effort: a malformed
//! row degrades to "no page number" or "no exercises", it never fails the
//! topic.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use mriynyk_shared::{Discipline, Grade, MriynykError, Page, Result, Topic};
use mriynyk_storage::{CorpusRow, Storage};

use crate::bounded::store_call;

/// Fetch and order all pages of `topic` for (grade, discipline).
///
/// Fails with `NotFound` when the topic has no rows.
#[instrument(skip_all, fields(topic = %topic, %grade, discipline = %discipline))]
pub async fn assemble_pages(
    storage: &Storage,
    topic: &Topic,
    grade: Grade,
    discipline: Discipline,
    limit: Duration,
) -> Result<Vec<Page>> {
    let rows = store_call(
        limit,
        "page fetch query",
        storage.fetch_topic_rows(grade.value(), discipline.label(), topic.as_str()),
    )
    .await?;

    if rows.is_empty() {
        return Err(MriynykError::not_found(format!(
            "no pages for topic '{topic}' (grade {grade}, {discipline})"
        )));
    }

    let pages = order_pages(rows);
    info!(pages = pages.len(), "assembled chapter");
    Ok(pages)
}

/// Convert rows to pages and sort them by recovered page number.
///
/// Rows without a number go last, keeping their relative order.
pub fn order_pages(rows: Vec<CorpusRow>) -> Vec<Page> {
    let mut pages: Vec<Page> = rows.into_iter().map(to_page).collect();
    // sort_by_key is stable
    pages.sort_by_key(|page| match page.page_number {
        Some(number) => (0u8, number),
        None => (1u8, 0),
    });
    pages
}

fn to_page(row: CorpusRow) -> Page {
    let metadata = row.page_metadata.as_deref();
    let page_number = extract_page_number(metadata);
    if page_number.is_none() {
        debug!("row has no book_page_number, ordering it last");
    }
    Page {
        text: row.page_text,
        exercises: extract_exercises(metadata),
        page_number,
    }
}

/// First integer textually attached to a `book_page_number` key.
///
/// This is a scan over the serialized payload rather than a parse, so it
/// also finds the key inside nested objects or embedded strings.
pub fn extract_page_number(metadata: Option<&str>) -> Option<u32> {
    static PAGE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"["']book_page_number["']\s*[:=]\s*["']?([0-9]+)"#).expect("valid regex")
    });

    let captures = PAGE_NUMBER_RE.captures(metadata?)?;
    captures.get(1)?.as_str().parse().ok()
}

/// Exercise texts from a metadata payload. Never fails.
///
/// The payload must be a JSON object whose `exercises` field is an array.
/// Object entries contribute their `text` field; other entries contribute
/// themselves. Empty, null, false and zero values are skipped.
pub fn extract_exercises(metadata: Option<&str>) -> Vec<String> {
    let Some(raw) = metadata else {
        return Vec::new();
    };

    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "unparseable page metadata, no exercises");
            return Vec::new();
        }
    };

    let Some(entries) = value.get("exercises").and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::Object(fields) => fields.get("text").and_then(exercise_text),
            other => exercise_text(other),
        })
        .collect()
}

fn exercise_text(value: &Value) -> Option<String> {
    if !is_truthy(value) {
        return None;
    }
    Some(match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{SeedRow, seeded_storage};

    fn row(text: &str, metadata: Option<&str>) -> CorpusRow {
        CorpusRow {
            page_text: text.to_string(),
            page_metadata: metadata.map(str::to_string),
        }
    }

    #[test]
    fn page_number_found_in_varied_shapes() {
        assert_eq!(extract_page_number(Some(r#"{"book_page_number": 3}"#)), Some(3));
        assert_eq!(
            extract_page_number(Some(r#"{"source": {"book_page_number":12, "line": 4}}"#)),
            Some(12)
        );
        assert_eq!(
            extract_page_number(Some(r#"{"raw": "'book_page_number': 7"}"#)),
            Some(7)
        );
        assert_eq!(extract_page_number(Some(r#"{"book_page_number": "5"}"#)), Some(5));
    }

    #[test]
    fn page_number_absent_or_malformed() {
        assert_eq!(extract_page_number(None), None);
        assert_eq!(extract_page_number(Some("{}")), None);
        assert_eq!(extract_page_number(Some(r#"{"book_page_number": null}"#)), None);
        assert_eq!(extract_page_number(Some(r#"{"page_number": 4}"#)), None);
        assert_eq!(
            extract_page_number(Some(r#"{"book_page_number": 99999999999}"#)),
            None
        );
    }

    #[test]
    fn page_number_stops_at_non_ascii_digits() {
        assert_eq!(extract_page_number(Some(r#"{"book_page_number": 12٣}"#)), Some(12));
        assert_eq!(extract_page_number(Some(r#"{"book_page_number": "٣"}"#)), None);
    }

    #[test]
    fn page_number_takes_first_match() {
        let meta = r#"{"book_page_number": 2, "next": {"book_page_number": 1}}"#;
        assert_eq!(extract_page_number(Some(meta)), Some(2));
    }

    #[test]
    fn exercises_from_strings_and_objects() {
        let strings = r#"{"exercises": ["Обчисліть", "", "Спростіть"]}"#;
        assert_eq!(extract_exercises(Some(strings)), vec!["Обчисліть", "Спростіть"]);

        let objects = r#"{"exercises": [{"text": "№1"}, {"id": 2}, {"text": ""}, {"text": 5}]}"#;
        assert_eq!(extract_exercises(Some(objects)), vec!["№1", "5"]);

        let mixed = r#"{"exercises": [0, false, null, 3, true]}"#;
        assert_eq!(extract_exercises(Some(mixed)), vec!["3", "true"]);
    }

    #[test]
    fn exercise_extraction_is_total() {
        for meta in [
            None,
            Some(""),
            Some("not json"),
            Some("[1, 2, 3]"),
            Some(r#""exercises""#),
            Some("42"),
            Some("null"),
            Some(r#"{"exercises": "do it"}"#),
            Some(r#"{"exercises": {"text": "x"}}"#),
            Some(r#"{"exercises": null}"#),
            Some(r#"{"other": []}"#),
        ] {
            assert!(extract_exercises(meta).is_empty(), "{meta:?}");
        }
    }

    #[test]
    fn pages_sorted_by_number_with_missing_last() {
        let pages = order_pages(vec![
            row("three", Some(r#"{"book_page_number": 3}"#)),
            row("loose-a", None),
            row("one", Some(r#"{"meta": {"book_page_number": 1}}"#)),
            row("loose-b", Some("garbage")),
            row("two", Some(r#"{"raw": "'book_page_number': 2"}"#)),
        ]);
        let texts: Vec<_> = pages.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three", "loose-a", "loose-b"]);
        assert_eq!(pages[0].page_number, Some(1));
        assert_eq!(pages[4].page_number, None);
    }

    #[test]
    fn equal_page_numbers_keep_row_order() {
        let pages = order_pages(vec![
            row("b", Some(r#"{"book_page_number": 4}"#)),
            row("a", Some(r#"{"book_page_number": 4}"#)),
        ]);
        let texts: Vec<_> = pages.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn assemble_orders_rows_from_store() {
        let storage = seeded_storage(&[
            SeedRow::new(Grade::Eighth, Discipline::Algebra, "Дроби")
                .text("page 3")
                .metadata(r#"{"book_page_number": 3, "exercises": ["№3"]}"#),
            SeedRow::new(Grade::Eighth, Discipline::Algebra, "Дроби")
                .text("page 1")
                .metadata(r#"{"source": {"book_page_number": 1}}"#),
            SeedRow::new(Grade::Eighth, Discipline::Algebra, "Дроби").text("no number"),
            SeedRow::new(Grade::Eighth, Discipline::Algebra, "Дроби")
                .text("page 2")
                .metadata(r#"{"raw": "'book_page_number': 2"}"#),
            SeedRow::new(Grade::Eighth, Discipline::Algebra, "Рівняння").text("elsewhere"),
        ])
        .await;
        let topic = Topic::new("Дроби");
        let limit = Duration::from_secs(5);

        let pages = assemble_pages(&storage, &topic, Grade::Eighth, Discipline::Algebra, limit)
            .await
            .unwrap();
        let texts: Vec<_> = pages.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["page 1", "page 2", "page 3", "no number"]);
        assert_eq!(pages[2].exercises, vec!["№3"]);

        let again = assemble_pages(&storage, &topic, Grade::Eighth, Discipline::Algebra, limit)
            .await
            .unwrap();
        assert_eq!(pages, again);
    }

    #[tokio::test]
    async fn assemble_fails_on_unknown_topic() {
        let storage =
            seeded_storage(&[SeedRow::new(Grade::Eighth, Discipline::Algebra, "Дроби")]).await;
        let err = assemble_pages(
            &storage,
            &Topic::new("Дроби"),
            Grade::Ninth,
            Discipline::Algebra,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MriynykError::NotFound(_)));
    }
}
